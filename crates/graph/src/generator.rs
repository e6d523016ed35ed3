use rand::rngs::ThreadRng;
use rand::Rng;

use crate::module::{Module, TestCase};
use crate::variant::Variant;

/// Number of modules per generated test case.
pub const DEFAULT_MODULE_COUNT: usize = 10;

/// Randomized module graph generator.
///
/// Every module is synchronous or suspending with equal odds. Every module
/// after the first imports one or two modules drawn from the lower-indexed
/// modules (acyclic) or from the whole set (cyclic).
pub struct GraphGenerator<R: Rng = ThreadRng> {
    rng: R,
    module_count: usize,
}

impl GraphGenerator<ThreadRng> {
    pub fn new(module_count: usize) -> Self {
        Self::with_rng(rand::rng(), module_count)
    }
}

impl Default for GraphGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new(DEFAULT_MODULE_COUNT)
    }
}

impl<R: Rng> GraphGenerator<R> {
    pub fn with_rng(rng: R, module_count: usize) -> Self {
        GraphGenerator {
            rng,
            module_count: module_count.max(1),
        }
    }

    pub fn module_count(&self) -> usize {
        self.module_count
    }

    pub fn generate(&mut self, variant: Variant) -> TestCase {
        let count = self.module_count;
        let mut modules = Vec::with_capacity(count);

        for i in 0..count {
            let suspends = self.rng.random_bool(0.5);
            let mut imports = Vec::new();
            if i > 0 {
                let limit = if variant.cyclic { count } else { i };
                let edges = if self.rng.random_bool(0.5) { 1 } else { 2 };
                for _ in 0..edges {
                    imports.push(self.rng.random_range(0..limit).to_string());
                }
            }
            let imports: Vec<&str> = imports.iter().map(String::as_str).collect();
            modules.push(Module::new(
                &i.to_string(),
                &imports,
                suspends,
                variant.trailing_deferred,
            ));
        }

        // Names are 0..count and every edge targets that range.
        TestCase { variant, modules }
    }
}
