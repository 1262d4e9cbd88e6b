use super::{
    DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_LOOP_ITERATIONS, EngineConfig, LimitsConfig,
};

pub trait Validate {
    fn validate(&mut self);
}

impl Validate for LimitsConfig {
    fn validate(&mut self) {
        if self.max_loop_iterations == 0 || self.max_loop_iterations > 1_000_000 {
            crate::log_warn!(
                "Invalid max_loop_iterations: {}. Using default: {}",
                self.max_loop_iterations,
                DEFAULT_MAX_LOOP_ITERATIONS
            );
            self.max_loop_iterations = DEFAULT_MAX_LOOP_ITERATIONS;
        }

        if self.max_call_depth == 0 || self.max_call_depth > 1024 {
            crate::log_warn!(
                "Invalid max_call_depth: {}. Using default: {}",
                self.max_call_depth,
                DEFAULT_MAX_CALL_DEPTH
            );
            self.max_call_depth = DEFAULT_MAX_CALL_DEPTH;
        }
    }
}

impl Validate for EngineConfig {
    fn validate(&mut self) {
        self.limits.validate();
    }
}
