//! Configuration loading for the search-run engine
//!
//! All distances are millimeters, angles radians, velocities mm/s or rad/s.

use crate::error::{NavError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub speed: SpeedConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    #[serde(default)]
    pub attach: AttachConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub idle: IdleConfig,
}

/// Control loop timing
#[derive(Clone, Debug, Deserialize)]
pub struct ControlConfig {
    /// Control period in milliseconds (default: 1.0)
    #[serde(default = "default_period_ms")]
    pub period_ms: f32,
}

/// Maze and machine geometry
#[derive(Clone, Debug, Deserialize)]
pub struct GeometryConfig {
    /// Cell width in millimeters (default: 180.0)
    #[serde(default = "default_cell_mm")]
    pub cell_mm: f32,

    /// Wall thickness in millimeters (default: 6.0)
    #[serde(default = "default_wall_thickness_mm")]
    pub wall_thickness_mm: f32,

    /// Distance from the rear edge to the axle in millimeters (default: 18.0)
    #[serde(default = "default_tail_mm")]
    pub tail_mm: f32,

    /// Forward trim applied to every segment length (default: 0.0)
    #[serde(default = "default_ahead_mm")]
    pub ahead_mm: f32,

    /// Distance between wheels in millimeters (default: 30.0)
    #[serde(default = "default_wheel_base_mm")]
    pub wheel_base_mm: f32,
}

/// Straight-segment velocity profile limits
#[derive(Clone, Debug, Deserialize)]
pub struct SpeedConfig {
    /// Nominal search velocity in mm/s (default: 240.0)
    #[serde(default = "default_search_mm_s")]
    pub search_mm_s: f32,

    /// Peak velocity for multi-cell straights in mm/s (default: 600.0)
    #[serde(default = "default_peak_mm_s")]
    pub peak_mm_s: f32,

    /// Straight profile jerk limit in mm/s³ (default: 500000.0)
    #[serde(default = "default_straight_jerk")]
    pub straight_jerk: f32,

    /// Straight profile acceleration limit in mm/s² (default: 6000.0)
    #[serde(default = "default_straight_accel")]
    pub straight_accel: f32,
}

/// In-place turn limits and tolerances
#[derive(Clone, Debug, Deserialize)]
pub struct TurnConfig {
    /// Angular speed ceiling in rad/s (default: 3π)
    #[serde(default = "default_turn_speed")]
    pub max_speed: f32,

    /// Spin-up angular acceleration in rad/s² (default: 24π)
    #[serde(default = "default_turn_accel")]
    pub accel: f32,

    /// Stopping deceleration in rad/s² (default: 24π)
    #[serde(default = "default_turn_decel")]
    pub decel: f32,

    /// Gain on the lateral offset servo during the turn (default: 1.0)
    #[serde(default = "default_back_gain")]
    pub back_gain: f32,

    /// Angular speed below which the turn may finish, rad/s (default: 0.1)
    #[serde(default = "default_turn_end_speed")]
    pub end_speed_tol: f32,

    /// Remaining angle below which the turn may finish, rad (default: 0.1)
    #[serde(default = "default_turn_end_angle")]
    pub end_angle_tol: f32,
}

/// Wall-referenced correction parameters
#[derive(Clone, Debug, Deserialize)]
pub struct CorrectionConfig {
    /// Lateral nudge gain per detected side wall (default: 0.002)
    #[serde(default = "default_avoid_gain")]
    pub avoid_gain: f32,

    /// Heading deviation above which avoidance is suppressed, rad
    /// (default: 0.05π)
    #[serde(default = "default_avoid_heading_limit")]
    pub avoid_heading_limit: f32,

    /// Minimum travel into the segment before a wall cut is accepted, mm
    /// (default: 30.0)
    #[serde(default = "default_cut_min_travel_mm")]
    pub cut_min_travel_mm: f32,

    /// Along-axis distance from the cell boundary to the sensor's wall-edge
    /// crossing, mm (default: 66.0)
    #[serde(default = "default_cut_offset_mm")]
    pub cut_offset_mm: f32,

    /// Front calibration acceptance band lower edge, mm (default: 60.0)
    #[serde(default = "default_calib_min_mm")]
    pub calib_min_mm: f32,

    /// Front calibration acceptance band upper edge, mm (default: 120.0)
    #[serde(default = "default_calib_max_mm")]
    pub calib_max_mm: f32,

    /// Known stop distance from a front wall, mm (default: 90.0)
    #[serde(default = "default_calib_stop_mm")]
    pub calib_stop_mm: f32,

    /// Fixed range-finder pipeline latency on top of staleness, ms
    /// (default: 5.0)
    #[serde(default = "default_calib_latency_ms")]
    pub calib_latency_ms: f32,

    /// Per-tick gain folding the lateral-error integral into heading
    /// (default: 1e-8)
    #[serde(default = "default_drift_integral_gain")]
    pub drift_integral_gain: f32,
}

/// Wall-attach regulator parameters
#[derive(Clone, Debug, Deserialize)]
pub struct AttachConfig {
    /// Proportional gain on front sensor delta (default: 72.0)
    #[serde(default = "default_attach_kp")]
    pub kp: f32,

    /// Integral gain on front sensor delta (default: 6.0)
    #[serde(default = "default_attach_ki")]
    pub ki: f32,

    /// Per-wheel command saturation in mm/s (default: 120.0)
    #[serde(default = "default_attach_saturation")]
    pub saturation_mm_s: f32,

    /// Summed wheel command below which the attach settles (default: 0.4)
    #[serde(default = "default_attach_settle")]
    pub settle_threshold: f32,

    /// Hard iteration cap, self-terminating under sensor failure
    /// (default: 3000)
    #[serde(default = "default_attach_max_ticks")]
    pub max_ticks: u32,

    /// Long-range threshold for a forced attach, mm (default: 180.0)
    #[serde(default = "default_attach_force_range")]
    pub force_range_mm: f32,

    /// Long-range threshold for an opportunistic attach, mm (default: 90.0)
    #[serde(default = "default_attach_near_range")]
    pub near_range_mm: f32,

    /// Close-range front reading that counts as wall contact, mm
    /// (default: 10.0)
    #[serde(default = "default_attach_contact_mm")]
    pub contact_mm: f32,
}

/// Recovery and fault maneuver parameters
#[derive(Clone, Debug, Deserialize)]
pub struct RecoveryConfig {
    /// Peak backward velocity of the put-back ramp, mm/s (default: 150.0)
    #[serde(default = "default_backoff_peak")]
    pub backoff_peak_mm_s: f32,

    /// Ticks to hold the peak backward velocity (default: 100)
    #[serde(default = "default_backoff_hold_ticks")]
    pub backoff_hold_ticks: u32,

    /// Heading correction gain while backing off (default: 200.0)
    #[serde(default = "default_backoff_heading_gain")]
    pub heading_gain: f32,

    /// Open-loop reverse duty for the first nudge (default: 0.1)
    #[serde(default = "default_first_nudge_duty")]
    pub first_nudge_duty: f32,

    /// Open-loop reverse duty for the second nudge (default: 0.2)
    #[serde(default = "default_second_nudge_duty")]
    pub second_nudge_duty: f32,

    /// Duration of each open-loop nudge in ms (default: 200)
    #[serde(default = "default_nudge_ms")]
    pub nudge_ms: u32,

    /// Velocity step per tick of the fault-stop ramp, mm/s (default: 9.0)
    #[serde(default = "default_stop_decel_step")]
    pub stop_decel_step: f32,
}

/// Idle hold-course loop parameters
#[derive(Clone, Debug, Deserialize)]
pub struct IdleConfig {
    /// Look-ahead distance at standstill, mm (default: 5.0)
    #[serde(default = "default_look_ahead_mm")]
    pub look_ahead_mm: f32,

    /// Look-ahead growth per unit of velocity (default: 20/240)
    #[serde(default = "default_look_ahead_gain")]
    pub look_ahead_gain: f32,

    /// Proportional gain on the look-ahead heading error (default: 40.0)
    #[serde(default = "default_idle_heading_gain")]
    pub heading_gain: f32,
}

// Default value functions
fn default_period_ms() -> f32 {
    1.0
}
fn default_cell_mm() -> f32 {
    180.0
}
fn default_wall_thickness_mm() -> f32 {
    6.0
}
fn default_tail_mm() -> f32 {
    18.0
}
fn default_ahead_mm() -> f32 {
    0.0
}
fn default_wheel_base_mm() -> f32 {
    30.0
}
fn default_search_mm_s() -> f32 {
    240.0
}
fn default_peak_mm_s() -> f32 {
    600.0
}
fn default_straight_jerk() -> f32 {
    500_000.0
}
fn default_straight_accel() -> f32 {
    6_000.0
}
fn default_turn_speed() -> f32 {
    3.0 * std::f32::consts::PI
}
fn default_turn_accel() -> f32 {
    24.0 * std::f32::consts::PI
}
fn default_turn_decel() -> f32 {
    24.0 * std::f32::consts::PI
}
fn default_back_gain() -> f32 {
    1.0
}
fn default_turn_end_speed() -> f32 {
    0.1
}
fn default_turn_end_angle() -> f32 {
    0.1
}
fn default_avoid_gain() -> f32 {
    0.002
}
fn default_avoid_heading_limit() -> f32 {
    0.05 * std::f32::consts::PI
}
fn default_cut_min_travel_mm() -> f32 {
    30.0
}
fn default_cut_offset_mm() -> f32 {
    66.0
}
fn default_calib_min_mm() -> f32 {
    60.0
}
fn default_calib_max_mm() -> f32 {
    120.0
}
fn default_calib_stop_mm() -> f32 {
    90.0
}
fn default_calib_latency_ms() -> f32 {
    5.0
}
fn default_drift_integral_gain() -> f32 {
    1e-8
}
fn default_attach_kp() -> f32 {
    72.0
}
fn default_attach_ki() -> f32 {
    6.0
}
fn default_attach_saturation() -> f32 {
    120.0
}
fn default_attach_settle() -> f32 {
    0.4
}
fn default_attach_max_ticks() -> u32 {
    3000
}
fn default_attach_force_range() -> f32 {
    180.0
}
fn default_attach_near_range() -> f32 {
    90.0
}
fn default_attach_contact_mm() -> f32 {
    10.0
}
fn default_backoff_peak() -> f32 {
    150.0
}
fn default_backoff_hold_ticks() -> u32 {
    100
}
fn default_backoff_heading_gain() -> f32 {
    200.0
}
fn default_first_nudge_duty() -> f32 {
    0.1
}
fn default_second_nudge_duty() -> f32 {
    0.2
}
fn default_nudge_ms() -> u32 {
    200
}
fn default_stop_decel_step() -> f32 {
    9.0
}
fn default_look_ahead_mm() -> f32 {
    5.0
}
fn default_look_ahead_gain() -> f32 {
    20.0 / 240.0
}
fn default_idle_heading_gain() -> f32 {
    40.0
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            cell_mm: default_cell_mm(),
            wall_thickness_mm: default_wall_thickness_mm(),
            tail_mm: default_tail_mm(),
            ahead_mm: default_ahead_mm(),
            wheel_base_mm: default_wheel_base_mm(),
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            search_mm_s: default_search_mm_s(),
            peak_mm_s: default_peak_mm_s(),
            straight_jerk: default_straight_jerk(),
            straight_accel: default_straight_accel(),
        }
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_speed: default_turn_speed(),
            accel: default_turn_accel(),
            decel: default_turn_decel(),
            back_gain: default_back_gain(),
            end_speed_tol: default_turn_end_speed(),
            end_angle_tol: default_turn_end_angle(),
        }
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            avoid_gain: default_avoid_gain(),
            avoid_heading_limit: default_avoid_heading_limit(),
            cut_min_travel_mm: default_cut_min_travel_mm(),
            cut_offset_mm: default_cut_offset_mm(),
            calib_min_mm: default_calib_min_mm(),
            calib_max_mm: default_calib_max_mm(),
            calib_stop_mm: default_calib_stop_mm(),
            calib_latency_ms: default_calib_latency_ms(),
            drift_integral_gain: default_drift_integral_gain(),
        }
    }
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            kp: default_attach_kp(),
            ki: default_attach_ki(),
            saturation_mm_s: default_attach_saturation(),
            settle_threshold: default_attach_settle(),
            max_ticks: default_attach_max_ticks(),
            force_range_mm: default_attach_force_range(),
            near_range_mm: default_attach_near_range(),
            contact_mm: default_attach_contact_mm(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            backoff_peak_mm_s: default_backoff_peak(),
            backoff_hold_ticks: default_backoff_hold_ticks(),
            heading_gain: default_backoff_heading_gain(),
            first_nudge_duty: default_first_nudge_duty(),
            second_nudge_duty: default_second_nudge_duty(),
            nudge_ms: default_nudge_ms(),
            stop_decel_step: default_stop_decel_step(),
        }
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            look_ahead_mm: default_look_ahead_mm(),
            look_ahead_gain: default_look_ahead_gain(),
            heading_gain: default_idle_heading_gain(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            geometry: GeometryConfig::default(),
            speed: SpeedConfig::default(),
            turn: TurnConfig::default(),
            correction: CorrectionConfig::default(),
            attach: AttachConfig::default(),
            recovery: RecoveryConfig::default(),
            idle: IdleConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: SearchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Control period in seconds
    pub fn period_s(&self) -> f32 {
        self.control.period_ms / 1000.0
    }

    /// Straight segment length for the start step: one cell minus the tail
    /// offset and half a wall, plus the forward trim.
    pub fn start_step_mm(&self) -> f32 {
        self.geometry.cell_mm - self.geometry.tail_mm - self.geometry.wall_thickness_mm / 2.0
            + self.geometry.ahead_mm
    }
}
