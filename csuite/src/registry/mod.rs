//! Strategy Registry: the table of execution strategies and hosting runtimes
//!
//! Built once by [`StrategyRegistry::native`] and then only read. Callers
//! pass the registry by reference; nothing registers itself globally.

use crate::error::{SuiteError, SuiteResult};
use crate::strategy::{
    BitcodeStrategy, CompilerKind, CompilerStrategy, ExecutionStrategy, HostRuntime,
};

/// Optimization levels registered for each native compiler
pub const OPTIMIZATION_LEVELS: &[&str] = &["O0", "O1", "O2", "O3"];

/// Priority of the bitcode interpreter, the default strategy
pub const BITCODE_PRIORITY: i32 = 10;

/// A registered strategy with its selection priority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyEntry {
    pub strategy: ExecutionStrategy,
    pub priority: i32,
}

/// Registry of hosting runtimes
#[derive(Debug, Clone, Default)]
pub struct HostRegistry {
    name: String,
    hosts: Vec<HostRuntime>,
}

impl HostRegistry {
    pub fn new(name: impl Into<String>, hosts: Vec<HostRuntime>) -> Self {
        Self {
            name: name.into(),
            hosts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hosts(&self) -> &[HostRuntime] {
        &self.hosts
    }

    /// Resolve a host by optional name and configuration.
    ///
    /// Unspecified parts pick the highest-priority match; the earliest
    /// registered host wins ties.
    pub fn select(&self, name: Option<&str>, config: Option<&str>) -> SuiteResult<&HostRuntime> {
        pick_highest(
            self.hosts.iter().filter(|h| {
                name.map_or(true, |n| h.name == n) && config.map_or(true, |c| h.config == c)
            }),
            |h| h.priority,
        )
        .ok_or_else(|| {
            SuiteError::unknown_host(name.unwrap_or("*"), config.unwrap_or("*"))
        })
    }
}

/// Registry of execution strategies, with the host registry they may run on
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    name: String,
    entries: Vec<StrategyEntry>,
    hosts: HostRegistry,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new(name: impl Into<String>, hosts: HostRegistry) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            hosts,
        }
    }

    /// The native registry: gcc and clang at O0..O3, plus the bitcode
    /// interpreter hosted on the Java registry
    pub fn native(hosts: Vec<HostRuntime>) -> SuiteResult<Self> {
        let mut registry = Self::new("Native", HostRegistry::new("Java", hosts));
        for level in OPTIMIZATION_LEVELS {
            let flag = format!("-{}", level);
            registry.add(CompilerStrategy::new(CompilerKind::Gcc, *level, [flag.clone()]), 0)?;
            registry.add(CompilerStrategy::new(CompilerKind::Clang, *level, [flag]), 0)?;
        }
        registry.add(BitcodeStrategy::new(), BITCODE_PRIORITY)?;
        Ok(registry)
    }

    /// Register a strategy; (name, config) must be unique
    pub fn add(
        &mut self,
        strategy: impl Into<ExecutionStrategy>,
        priority: i32,
    ) -> SuiteResult<()> {
        let strategy = strategy.into();
        if self.get(strategy.name(), strategy.config_name()).is_some() {
            return Err(SuiteError::DuplicateStrategy {
                name: strategy.name().to_string(),
                config: strategy.config_name().to_string(),
            });
        }
        self.entries.push(StrategyEntry { strategy, priority });
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[StrategyEntry] {
        &self.entries
    }

    pub fn hosts(&self) -> &HostRegistry {
        &self.hosts
    }

    /// Exact lookup by identity
    pub fn get(&self, name: &str, config: &str) -> Option<&ExecutionStrategy> {
        self.entries
            .iter()
            .find(|e| e.strategy.name() == name && e.strategy.config_name() == config)
            .map(|e| &e.strategy)
    }

    /// Resolve a strategy from optional CLI selections
    pub fn select(
        &self,
        name: Option<&str>,
        config: Option<&str>,
    ) -> SuiteResult<&ExecutionStrategy> {
        pick_highest(
            self.entries.iter().filter(|e| {
                name.map_or(true, |n| e.strategy.name() == n)
                    && config.map_or(true, |c| e.strategy.config_name() == c)
            }),
            |e| e.priority,
        )
        .map(|e| &e.strategy)
        .ok_or_else(|| SuiteError::unknown_strategy(name.unwrap_or("*"), config.unwrap_or("*")))
    }

    /// Resolve the host a strategy runs on; `None` for unhosted strategies
    pub fn select_host(
        &self,
        strategy: &ExecutionStrategy,
        name: Option<&str>,
        config: Option<&str>,
    ) -> SuiteResult<Option<&HostRuntime>> {
        if !strategy.is_hosted() {
            if name.is_some() || config.is_some() {
                tracing::warn!(
                    strategy = %strategy,
                    "Hosting runtime selected for a strategy that runs natively; ignoring"
                );
            }
            return Ok(None);
        }
        self.hosts.select(name, config).map(Some)
    }
}

/// First item with the highest priority
fn pick_highest<'a, T>(
    items: impl Iterator<Item = &'a T>,
    priority: impl Fn(&T) -> i32,
) -> Option<&'a T> {
    let mut best: Option<&T> = None;
    for item in items {
        match best {
            Some(b) if priority(b) >= priority(item) => {}
            _ => best = Some(item),
        }
    }
    best
}
