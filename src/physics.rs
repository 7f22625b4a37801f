/// Physics Validator (C6) - mandatory, non-negotiable kinematic
/// constraints. Grounded on `physics_validator.py`: speed physics
/// (acceleration/deceleration/delta-per-cycle), steering physics
/// (max rate), and cross-signal correlation rules, combined into a
/// weighted `physics_score` exactly as `get_physics_score` does.
use crate::config::PipelineConfig;

/// Per-sub-validator outcome: a human-readable reason (absent when
/// valid) plus the sub-score in [0, 1] (1 = perfect).
#[derive(Debug, Clone, PartialEq)]
pub struct SubResult {
    pub valid: bool,
    pub reason: Option<String>,
    pub score: f64,
}

/// Combined result of `PhysicsValidator::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsResult {
    pub physics_score: f64,
    pub speed: SubResult,
    pub steering: SubResult,
    pub correlation: SubResult,
    pub overall_valid: bool,
}

#[derive(Debug, Clone, Copy)]
struct LastState {
    speed: f64,
    steering: f64,
    timestamp: f64,
}

pub struct PhysicsValidator<'a> {
    config: &'a PipelineConfig,
    last: Option<LastState>,
    recent_steerings: Vec<f64>,
}

const HISTORY_LEN: usize = 10;

impl<'a> PhysicsValidator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            last: None,
            recent_steerings: Vec::new(),
        }
    }

    fn validate_speed(&self, speed: f64, timestamp: f64) -> SubResult {
        let Some(last) = self.last else {
            return SubResult {
                valid: true,
                reason: None,
                score: 1.0,
            };
        };
        let dt = timestamp - last.timestamp;
        if dt <= 0.0 {
            return SubResult {
                valid: true,
                reason: None,
                score: 1.0,
            };
        }

        let speed_delta = speed - last.speed;
        let acceleration = (speed_delta / 3.6) / dt;

        let mut violation_score = 0.0_f64;
        let mut violations = Vec::new();

        if acceleration > self.config.max_acceleration_mps2 {
            violation_score = (acceleration / self.config.max_acceleration_mps2 - 1.0).min(1.0);
            violations.push(format!("accel:{acceleration:.1}m/s²"));
        }
        if acceleration < -self.config.max_deceleration_mps2 {
            violation_score = violation_score.max(
                (acceleration.abs() / self.config.max_deceleration_mps2 - 1.0).min(1.0),
            );
            violations.push(format!("decel:{acceleration:.1}m/s²"));
        }
        if speed_delta.abs() > self.config.max_speed_delta_per_cycle_kmh
            && dt < self.config.max_speed_delta_cycle_seconds
        {
            violation_score = violation_score.max(0.8);
            violations.push(format!("delta:{speed_delta:.1}km/h"));
        }

        let valid = violation_score < 0.5;
        SubResult {
            valid,
            reason: (!violations.is_empty())
                .then(|| format!("physics_violation: {}", violations.join(", "))),
            score: 1.0 - violation_score,
        }
    }

    fn validate_steering(&self, steering: f64, timestamp: f64) -> SubResult {
        let Some(last) = self.last else {
            return SubResult {
                valid: true,
                reason: None,
                score: 1.0,
            };
        };
        let dt = timestamp - last.timestamp;
        if dt <= 0.0 {
            return SubResult {
                valid: true,
                reason: None,
                score: 1.0,
            };
        }

        let steering_rate = (steering - last.steering).abs() / dt;
        let mut violation_score = 0.0;
        let mut violations = Vec::new();
        if steering_rate > self.config.max_steering_rate_deg_per_s {
            violation_score = (steering_rate / self.config.max_steering_rate_deg_per_s - 1.0).min(1.0);
            violations.push(format!("rate:{steering_rate:.1}°/s"));
        }

        let valid = violation_score < 0.5;
        SubResult {
            valid,
            reason: (!violations.is_empty())
                .then(|| format!("steering_physics: {}", violations.join(", "))),
            score: 1.0 - violation_score,
        }
    }

    fn validate_correlation(&self, speed: f64, steering: f64, brake: f64) -> SubResult {
        let mut violation_score = 0.0_f64;
        let mut violations = Vec::new();

        if let Some(last) = self.last {
            let speed_increasing = speed > last.speed + 1.0;
            if speed_increasing && brake > 10.0 {
                violation_score = violation_score.max(0.7);
                violations.push("speed_up_while_braking".to_string());
            }
        }

        if speed > 80.0 && steering.abs() < 1.0 {
            let stable_count = self
                .recent_steerings
                .iter()
                .filter(|s| s.abs() < 1.0)
                .count();
            if stable_count > 8 {
                violation_score = violation_score.max(0.3);
                violations.push("high_speed_no_steering".to_string());
            }
        }

        if speed > 60.0 && steering.abs() > 25.0 {
            violation_score = violation_score.max(0.6);
            violations.push("extreme_steering_high_speed".to_string());
        }

        let valid = violation_score < 0.5;
        SubResult {
            valid,
            reason: (!violations.is_empty())
                .then(|| format!("correlation: {}", violations.join(", "))),
            score: 1.0 - violation_score,
        }
    }

    /// Validate `(speed, steering, brake)` at `timestamp`, updating
    /// internal history afterward (order matches the Python source:
    /// history is updated only once, after both speed and steering are
    /// scored against the *previous* state).
    pub fn validate(&mut self, speed: f64, steering: f64, brake: f64, timestamp: f64) -> PhysicsResult {
        let speed_result = self.validate_speed(speed, timestamp);
        let steering_result = self.validate_steering(steering, timestamp);
        let correlation_result = self.validate_correlation(speed, steering, brake);

        let physics_score =
            0.5 * speed_result.score + 0.3 * steering_result.score + 0.2 * correlation_result.score;
        let overall_valid = speed_result.valid && steering_result.valid && correlation_result.valid;

        self.last = Some(LastState {
            speed,
            steering,
            timestamp,
        });
        self.recent_steerings.push(steering);
        if self.recent_steerings.len() > HISTORY_LEN {
            self.recent_steerings.remove(0);
        }

        PhysicsResult {
            physics_score,
            speed: speed_result,
            steering: steering_result,
            correlation: correlation_result,
            overall_valid,
        }
    }
}
