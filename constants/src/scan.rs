/// Angular width of one heading coverage bucket (degrees)
pub const COVERAGE_BUCKET_DEGREES: f32 = 10.0;

/// Length of every scan ray, in world units
pub const SCAN_RAY_RANGE: f32 = 50.0;

/// Total vertical field of view swept by the scanner (degrees)
pub const SCAN_VERTICAL_FOV_DEGREES: f32 = 30.0;

/// Pitch advance per sweep iteration (degrees)
pub const SCAN_PITCH_STEP_DEGREES: f32 = 1.0;

/// Rays cast per sweep iteration
pub const SCAN_FAN_RAYS: u32 = 16;

/// Horizontal spread of one ray fan, centred on the agent heading (degrees)
pub const SCAN_FAN_WIDTH_DEGREES: f32 = 90.0;

/// Pause between sweep iterations (milliseconds)
pub const SCAN_ITERATION_PAUSE_MS: u64 = 1;

/// Upper bound on marker despawns handled per frame
pub const MAX_DESTROYS_PER_TICK: usize = 500;

/// Colour given to the scan origin point
pub const SCAN_ORIGIN_COLOUR: [u8; 4] = [255, 255, 255, 255];

/// Default top speed of a spin driver (degrees per second)
pub const SPIN_MAX_SPEED_DEGREES: f32 = 180.0;
