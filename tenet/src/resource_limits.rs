/// Resource limits that bound the work of a single resolution
///
/// Mutually dependent formulas are only caught by the composition guard,
/// so these limits also keep pathological knowledge bases from recursing
/// without end.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum nesting of composed formulas
    /// Real usage: ~3 levels, Limit: 32
    pub max_composition_depth: usize,

    /// Maximum number of indices a `selectAll` requirement may bind
    pub max_series_length: usize,

    /// Maximum rewrite passes before `simplify` returns the current tree
    pub max_simplify_passes: usize,

    /// Maximum rounds of `Engine::solve` before it gives up on progress
    pub max_saturation_rounds: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_composition_depth: 32,
            max_series_length: 1024,
            max_simplify_passes: 16,
            max_saturation_rounds: 64,
        }
    }
}

impl ResourceLimits {
    /// Create a new ResourceLimits with default values
    pub fn new() -> Self {
        Self::default()
    }
}
