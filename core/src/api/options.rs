//! Configuration options for the engine.

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use sift_core::api::CompilationOptions;
///
/// let options = CompilationOptions { max_depth: 200 };
/// ```
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    /// Maximum nesting depth of the expression tree. Deeper trees fail to
    /// compile instead of exhausting the stack.
    ///
    /// Default: 1000
    pub max_depth: usize,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}

/// Configuration options for the engine.
///
/// # Example
///
/// ```
/// use sift_core::api::{CompilationOptions, EngineOptions};
///
/// let options = EngineOptions {
///     compilation: CompilationOptions { max_depth: 200 },
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Options used by `Engine::compile`.
    pub compilation: CompilationOptions,
}
