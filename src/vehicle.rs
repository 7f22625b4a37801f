/// Vehicle model collaborator (§6) - the kinematic vehicle-state
/// simulator this core applies sanitised commands to. Explicitly out
/// of scope per spec §1 ("the kinematic vehicle-state simulator");
/// reached only through the narrow `VehicleModel` trait so the
/// pipeline never depends on its internals.
///
/// Grounded on `vehicle_state.py`'s `VehicleStateEngine`: position
/// integration, heading update from steering, and a manual-control
/// latch set by `force_speed_update`. The Python source ran position
/// and braking updates on free-running background threads at 10/100 Hz;
/// this core is synchronous (spec §5: "all detection components are
/// invoked synchronously from the listener task"), so `KinematicVehicle`
/// instead advances its physics once per call, driven by the caller's
/// own timestamps - no threads of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub x_position: f64,
    pub y_position: f64,
    pub speed_kmh: f64,
    pub steering_deg: f64,
    pub heading_deg: f64,
    pub brake_pct: f64,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            x_position: 0.0,
            y_position: 0.0,
            speed_kmh: 30.0,
            steering_deg: 0.0,
            heading_deg: 0.0,
            brake_pct: 0.0,
        }
    }
}

/// Narrow interface the listener uses to apply sanitised commands
/// (spec §6). Kept trait-based so test harnesses can substitute a
/// recording double without pulling in the kinematic model.
pub trait VehicleModel {
    fn update_speed(&mut self, speed_kmh: f64);
    fn force_speed_update(&mut self, speed_kmh: f64);
    fn update_steering(&mut self, steering_deg: f64);
    fn apply_brake(&mut self, brake_pct: f64);
    fn get_state(&self) -> VehicleState;
    fn reset(&mut self);
}

/// A simple forward-Euler kinematic model: integrates position from
/// speed and heading, derives heading change from steering angle,
/// applies brake-proportional deceleration. Not part of the detection
/// pipeline's trusted surface - purely a downstream consumer of
/// sanitised commands.
pub struct KinematicVehicle {
    state: VehicleState,
    manual_control: bool,
    last_update: f64,
}

impl KinematicVehicle {
    pub fn new() -> Self {
        Self {
            state: VehicleState::default(),
            manual_control: false,
            last_update: 0.0,
        }
    }

    /// Advance position/heading/speed by `dt` seconds. Call once per
    /// listener cycle with the delta since the previous call.
    pub fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        if self.state.brake_pct > 0.0 {
            let deceleration_per_second = self.state.brake_pct * 0.5;
            self.state.speed_kmh = (self.state.speed_kmh - deceleration_per_second * dt).max(0.0);
        }

        if self.state.speed_kmh > 0.0 && self.state.steering_deg.abs() > 0.1 {
            let turn_rate = self.state.steering_deg * 2.0;
            self.state.heading_deg = (self.state.heading_deg + turn_rate * dt).rem_euclid(360.0);
        }

        let speed_ms = self.state.speed_kmh / 3.6;
        let heading_rad = self.state.heading_deg.to_radians();
        self.state.x_position += speed_ms * heading_rad.cos() * dt;
        self.state.y_position += speed_ms * heading_rad.sin() * dt;

        self.last_update += dt;
    }
}

impl Default for KinematicVehicle {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleModel for KinematicVehicle {
    fn update_speed(&mut self, speed_kmh: f64) {
        if self.manual_control {
            return;
        }
        if self.state.brake_pct == 0.0 {
            self.state.speed_kmh = speed_kmh.max(0.0);
        }
    }

    fn force_speed_update(&mut self, speed_kmh: f64) {
        self.manual_control = true;
        self.state.speed_kmh = speed_kmh.max(0.0);
    }

    fn update_steering(&mut self, steering_deg: f64) {
        self.state.steering_deg = steering_deg.clamp(-45.0, 45.0);
    }

    fn apply_brake(&mut self, brake_pct: f64) {
        self.state.brake_pct = brake_pct.clamp(0.0, 100.0);
    }

    fn get_state(&self) -> VehicleState {
        self.state
    }

    fn reset(&mut self) {
        self.manual_control = false;
        self.state = VehicleState::default();
        self.last_update = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_control_latch_ignores_ecu_speed_updates() {
        let mut vehicle = KinematicVehicle::new();
        vehicle.force_speed_update(80.0);
        vehicle.update_speed(10.0);
        assert_eq!(vehicle.get_state().speed_kmh, 80.0);
    }

    #[test]
    fn steering_is_clamped_to_physical_limits() {
        let mut vehicle = KinematicVehicle::new();
        vehicle.update_steering(90.0);
        assert_eq!(vehicle.get_state().steering_deg, 45.0);
        vehicle.update_steering(-90.0);
        assert_eq!(vehicle.get_state().steering_deg, -45.0);
    }

    #[test]
    fn braking_decelerates_speed_over_time() {
        let mut vehicle = KinematicVehicle::new();
        vehicle.update_speed(50.0);
        vehicle.apply_brake(50.0);
        vehicle.step(1.0);
        assert!(vehicle.get_state().speed_kmh < 50.0);
    }

    #[test]
    fn reset_restores_defaults_and_clears_manual_control() {
        let mut vehicle = KinematicVehicle::new();
        vehicle.force_speed_update(80.0);
        vehicle.reset();
        assert_eq!(vehicle.get_state().speed_kmh, 30.0);
        vehicle.update_speed(10.0);
        assert_eq!(vehicle.get_state().speed_kmh, 10.0);
    }
}
