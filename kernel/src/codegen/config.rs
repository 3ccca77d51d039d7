/// Paths written into the generated Rust sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenConfig {
    /// Crate the generated code imports the runtime types from.
    pub runtime_crate: &'static str,
    /// Module, relative to the installer, holding the trampoline declarations.
    pub trampoline_module: &'static str,
    /// Module, relative to the declarations, defining the implemented handlers.
    pub handler_module: &'static str,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            runtime_crate: "trapgen",
            trampoline_module: "super::trampolines",
            handler_module: "super::handlers",
        }
    }
}
