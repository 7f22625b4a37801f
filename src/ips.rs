/// IPS Policy Engine (C10) - trust-driven sanitisation state machine.
///
/// Grounded on `ips_engine.py`'s `IPSPolicyEngine`: the same
/// trust-threshold mode table, the same recovery-timer semantics (any
/// dip resets it; leaving a non-OFF mode needs a continuous run of
/// high trust), and the same `sanitize_speed`/`sanitize_steering`
/// override behaviour. Per spec §4.10 the recovery window is 5 s (the
/// Python source used two different constants, 5.0 in the timer check
/// and a separate unused 10.0 `RECOVERY_TIME`; this keeps only the one
/// spec.md names). `now_seconds` is passed in rather than read from
/// the wall clock, so the listener controls time and tests stay
/// deterministic.
use crate::config::PipelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpsMode {
    Off,
    SoftLimit,
    SafeMode,
    Critical,
}

/// Per-mode control limits, per spec §4.10's table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyLimits {
    pub mode: IpsMode,
    pub speed_cap_kmh: Option<f64>,
    pub steering_cap_deg: Option<f64>,
}

pub struct IpsPolicyEngine<'a> {
    config: &'a PipelineConfig,
    mode: IpsMode,
    last_safe_speed: f64,
    last_safe_steering: f64,
    /// 0.0 means "not currently accumulating a recovery run".
    recovery_start: f64,
}

impl<'a> IpsPolicyEngine<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            mode: IpsMode::Off,
            last_safe_speed: 30.0,
            last_safe_steering: 0.0,
            recovery_start: 0.0,
        }
    }

    pub fn mode(&self) -> IpsMode {
        self.mode
    }

    /// True while the engine is actively sanitising output (non-OFF),
    /// consumed by the Trust Engine to gate recovery credit.
    pub fn is_active(&self) -> bool {
        self.mode != IpsMode::Off
    }

    /// Advance the policy state machine from `trust_score` at
    /// `now_seconds`. Anomaly score is observational only (spec §4.10:
    /// "Transitions are driven solely by trust score").
    pub fn update(&mut self, trust_score: f64, now_seconds: f64) {
        if trust_score < self.config.ips_off_threshold {
            self.mode = if trust_score >= self.config.ips_soft_limit_threshold {
                IpsMode::SoftLimit
            } else if trust_score >= self.config.ips_safe_mode_threshold {
                IpsMode::SafeMode
            } else {
                IpsMode::Critical
            };
            self.recovery_start = 0.0;
            return;
        }

        if self.mode != IpsMode::Off {
            if self.recovery_start == 0.0 {
                self.recovery_start = now_seconds;
            } else if now_seconds - self.recovery_start > self.config.ips_recovery_seconds {
                self.mode = IpsMode::Off;
                self.recovery_start = 0.0;
            }
        }
    }

    fn limits(&self) -> PolicyLimits {
        match self.mode {
            IpsMode::Off => PolicyLimits {
                mode: IpsMode::Off,
                speed_cap_kmh: None,
                steering_cap_deg: None,
            },
            IpsMode::SoftLimit => PolicyLimits {
                mode: IpsMode::SoftLimit,
                speed_cap_kmh: Some(40.0),
                steering_cap_deg: Some(15.0),
            },
            IpsMode::SafeMode => PolicyLimits {
                mode: IpsMode::SafeMode,
                speed_cap_kmh: Some(35.0),
                steering_cap_deg: Some(10.0),
            },
            IpsMode::Critical => PolicyLimits {
                mode: IpsMode::Critical,
                speed_cap_kmh: Some(25.0),
                steering_cap_deg: Some(5.0),
            },
        }
    }

    /// Sanitize a requested speed against `current_speed`. While OFF,
    /// passes the request through and records it as the latest safe
    /// value; otherwise overrides with `min(cap, current + 2)`, floored
    /// at 10 km/h.
    pub fn sanitize_speed(&mut self, requested_speed: f64, current_speed: f64) -> f64 {
        let limits = self.limits();
        let Some(cap) = limits.speed_cap_kmh else {
            self.last_safe_speed = requested_speed;
            return requested_speed;
        };

        let safe_speed = (current_speed + 2.0).min(cap).max(10.0);
        self.last_safe_speed = safe_speed;
        safe_speed
    }

    /// Sanitize a requested steering angle. While OFF, passes through;
    /// otherwise decays the last safe value toward 0 by a factor of 0.9
    /// per call and clamps to the mode's steering cap.
    pub fn sanitize_steering(&mut self, requested_steering: f64) -> f64 {
        let limits = self.limits();
        let Some(cap) = limits.steering_cap_deg else {
            self.last_safe_steering = requested_steering;
            return requested_steering;
        };

        let safe_steering = (self.last_safe_steering * 0.9).clamp(-cap, cap);
        self.last_safe_steering = safe_steering;
        safe_steering
    }
}
