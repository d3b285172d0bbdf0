//! Run aggregation: resolve every entity instance and collect schemas.
//!
//! [`RunAggregator`] owns the dictionary, the digest oracle and the schema
//! synthesizer for one pass over a game's scenes. Instances are fed in scene
//! order; [`RunAggregator::finish`] hands back a [`RunReport`] with the schemas,
//! the unresolved digests and the summary counters.

use crate::dictionary::CandidateDictionary;
use crate::digest::{DigestOracle, HashAlgorithm, Md5};
use crate::error::{Error, Result};
use crate::resolver::{DigestIndex, Resolution, ResolveStats, ResolveStrategy, Resolver, Symbol};
use crate::schema::{
    render_schemas, EntityTypeSchema, FieldDescriptor, RenderConfig, SchemaSynthesizer,
    VariableType,
};
use indexmap::IndexSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// A field reference of one entity instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Field name
    pub name: Symbol,
    /// Stored type
    pub ty: VariableType,
}

impl FieldRef {
    /// Creates a new field reference
    pub fn new(name: Symbol, ty: VariableType) -> Self {
        Self { name, ty }
    }
}

/// One entity as read from a scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInstance {
    /// Entity type name
    pub type_name: Symbol,
    /// Editable fields in stored order
    pub fields: Vec<FieldRef>,
}

impl EntityInstance {
    /// Creates an instance with no fields
    pub fn new(type_name: Symbol) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    /// Adds a field
    pub fn with_field(mut self, name: Symbol, ty: VariableType) -> Self {
        self.fields.push(FieldRef::new(name, ty));
        self
    }
}

/// Configuration for a run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Resolve batches on the rayon pool (needs the `parallel` feature)
    pub parallel: bool,
    /// Seed the dictionary with the base entity field names
    pub seed_base_fields: bool,
    /// Dictionary matching strategy
    pub strategy: ResolveStrategy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            seed_base_fields: true,
            strategy: ResolveStrategy::Scan,
        }
    }
}

impl RunConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether batches are resolved in parallel
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets whether base field names are seeded
    pub fn seed_base_fields(mut self, seed: bool) -> Self {
        self.seed_base_fields = seed;
        self
    }

    /// Sets the matching strategy
    pub fn strategy(mut self, strategy: ResolveStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Summary counters of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Distinct entity types
    pub entity_types: usize,
    /// Distinct field names, base fields and unresolved names included
    pub distinct_field_names: usize,
    /// Distinct digests nothing matched
    pub unresolved: usize,
    /// Entity instances processed
    pub instances: usize,
    /// Symbols answered from inline text
    pub inline_hits: u64,
    /// Symbols matched against the dictionary
    pub dictionary_hits: u64,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects, {} unique variable names, {} unresolved symbols",
            self.entity_types, self.distinct_field_names, self.unresolved
        )
    }
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One schema per entity type, in first-seen order
    pub schemas: Vec<EntityTypeSchema>,
    /// Hex names of unresolved digests, in first-seen order
    pub unresolved: Vec<String>,
    /// Summary counters
    pub stats: RunStats,
}

impl RunReport {
    /// Render the schema listing
    pub fn render(&self, config: &RenderConfig) -> String {
        render_schemas(&self.schemas, config)
    }

    /// Render the schema listing into a file, creating parent directories
    pub fn write_to(&self, path: impl AsRef<Path>, config: &RenderConfig) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::file_write(parent, e))?;
        }
        std::fs::write(path, self.render(config)).map_err(|e| Error::file_write(path, e))?;
        debug!("Wrote {} schemas to {}", self.schemas.len(), path.display());
        Ok(())
    }
}

/// Drives resolution and schema synthesis over a stream of entity instances
#[derive(Debug)]
pub struct RunAggregator<A: HashAlgorithm = Md5> {
    config: RunConfig,
    dictionary: CandidateDictionary,
    oracle: DigestOracle<A>,
    index: Option<DigestIndex>,
    synthesizer: SchemaSynthesizer,
    unresolved: IndexSet<String>,
    instances: usize,
    totals: ResolveStats,
}

impl Default for RunAggregator<Md5> {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl RunAggregator<Md5> {
    /// Creates an aggregator using MD5
    pub fn new(config: RunConfig) -> Self {
        Self::with_oracle(config, DigestOracle::new())
    }
}

impl<A: HashAlgorithm> RunAggregator<A> {
    /// Creates an aggregator over a custom oracle
    pub fn with_oracle(config: RunConfig, oracle: DigestOracle<A>) -> Self {
        let dictionary = if config.seed_base_fields {
            CandidateDictionary::with_base_fields()
        } else {
            CandidateDictionary::new()
        };

        Self {
            config,
            dictionary,
            oracle,
            index: None,
            synthesizer: SchemaSynthesizer::new(),
            unresolved: IndexSet::new(),
            instances: 0,
            totals: ResolveStats::default(),
        }
    }

    /// Adds known names to the dictionary
    ///
    /// Names should be seeded before the first instance; instances already
    /// processed are not revisited.
    pub fn seed<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.instances > 0 {
            warn!(
                "Seeding dictionary after {} instances were processed",
                self.instances
            );
        }
        self.dictionary.add_all(names)
    }

    /// The candidate dictionary
    pub fn dictionary(&self) -> &CandidateDictionary {
        &self.dictionary
    }

    /// Mutable access to the candidate dictionary
    pub fn dictionary_mut(&mut self) -> &mut CandidateDictionary {
        &mut self.dictionary
    }

    /// The digest oracle
    pub fn oracle(&self) -> &DigestOracle<A> {
        &self.oracle
    }

    /// Process a single instance
    pub fn process(&mut self, instance: &EntityInstance) {
        self.process_batch(std::slice::from_ref(instance));
    }

    /// Process instances in order
    ///
    /// Every symbol of the batch is resolved up front (in parallel when
    /// enabled), then the results are folded in input order, so the outcome
    /// does not depend on the parallel setting.
    pub fn process_batch(&mut self, instances: &[EntityInstance]) {
        let symbols: Vec<&Symbol> = instances
            .iter()
            .flat_map(|instance| {
                std::iter::once(&instance.type_name)
                    .chain(instance.fields.iter().map(|field| &field.name))
            })
            .collect();

        let resolutions = self.resolve_symbols(&symbols);
        let mut resolutions = resolutions.into_iter();

        for instance in instances {
            let Some(type_name) = resolutions.next() else {
                break;
            };
            let fields: Vec<Resolution> = resolutions.by_ref().take(instance.fields.len()).collect();
            self.fold_instance(instance, type_name, fields);
        }
    }

    fn resolve_symbols(&mut self, symbols: &[&Symbol]) -> Vec<Resolution> {
        if self.config.strategy == ResolveStrategy::Indexed
            && !self
                .index
                .as_ref()
                .is_some_and(|index| index.is_current(&self.dictionary))
        {
            self.index = Some(DigestIndex::build(&self.dictionary, &self.oracle));
        }

        let resolver = match &self.index {
            Some(index) if self.config.strategy == ResolveStrategy::Indexed => {
                Resolver::with_index(&self.dictionary, &self.oracle, index)
            }
            _ => Resolver::with_strategy(&self.dictionary, &self.oracle, self.config.strategy),
        };

        let resolutions = if self.config.parallel {
            resolver.resolve_all(symbols)
        } else {
            resolver.resolve_all_sequential(symbols)
        };

        let stats = resolver.stats();
        self.totals.inline += stats.inline;
        self.totals.dictionary += stats.dictionary;
        self.totals.unresolved += stats.unresolved;
        self.totals.lookups += stats.lookups;
        resolutions
    }

    fn fold_instance(
        &mut self,
        instance: &EntityInstance,
        type_name: Resolution,
        fields: Vec<Resolution>,
    ) {
        self.instances += 1;

        let key = type_name.display_name().into_owned();
        if !type_name.is_resolved() {
            self.note_unresolved(&key, "object");
        }

        if self.synthesizer.begin_entity(&key) {
            debug!("Recording schema for {}", key);
        }

        for (field, resolution) in instance.fields.iter().zip(fields) {
            let name = resolution.display_name().into_owned();
            if !resolution.is_resolved() {
                self.note_unresolved(&name, "variable");
            }
            self.synthesizer
                .record_field(&key, FieldDescriptor::new(name, field.ty));
        }

        self.synthesizer.seal(&key);
    }

    fn note_unresolved(&mut self, name: &str, kind: &str) {
        if self.unresolved.insert(name.to_string()) {
            info!("Unknown {} name {}", kind, name);
        }
    }

    /// Current summary counters
    pub fn stats(&self) -> RunStats {
        RunStats {
            entity_types: self.synthesizer.entity_count(),
            distinct_field_names: self.synthesizer.field_name_count(),
            unresolved: self.unresolved.len(),
            instances: self.instances,
            inline_hits: self.totals.inline,
            dictionary_hits: self.totals.dictionary,
        }
    }

    /// Consumes the aggregator and produces the report
    pub fn finish(self) -> RunReport {
        let stats = self.stats();
        let cache = self.oracle.cache().stats();
        debug!(
            "Digest cache: {} entries, {} hits, {} misses",
            cache.entries, cache.hits, cache.misses
        );

        RunReport {
            schemas: self.synthesizer.finalize(),
            unresolved: self.unresolved.into_iter().collect(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aggregator() -> RunAggregator {
        let mut run = RunAggregator::new(RunConfig::new().parallel(false));
        run.seed(["Ring", "Player", "xPos"]);
        run
    }

    fn hashed(run: &RunAggregator, name: &str) -> Symbol {
        Symbol::hashed(run.oracle().digest(name.as_bytes()))
    }

    fn inline(run: &RunAggregator, name: &str) -> Symbol {
        Symbol::from_text(run.oracle(), name)
    }

    #[test]
    fn test_ring_scenario() {
        let mut run = aggregator();
        let mystery = run.oracle().digest(b"Sparkle");

        let instance = EntityInstance::new(hashed(&run, "Ring"))
            .with_field(inline(&run, "angle"), VariableType::Enum)
            .with_field(inline(&run, "type"), VariableType::Enum)
            .with_field(hashed(&run, "xPos"), VariableType::Int32)
            .with_field(Symbol::hashed(mystery), VariableType::Float);
        run.process(&instance);

        let report = run.finish();
        assert_eq!(report.unresolved, vec![mystery.to_hex()]);
        assert_eq!(
            report.render(&RenderConfig::default()),
            format!(
                "struct EntityRing {{\n\tRSDK_ENTITY\n\tint32 type;\n\tint32 xPos;\n\tfloat {};\n}};\n\n",
                mystery.to_hex()
            )
        );
        assert_eq!(report.stats.entity_types, 1);
        assert_eq!(report.stats.distinct_field_names, 4);
        assert_eq!(report.stats.unresolved, 1);
    }

    #[test]
    fn test_first_instance_wins() {
        let mut run = aggregator();
        let first = EntityInstance::new(hashed(&run, "Player"))
            .with_field(inline(&run, "characterID"), VariableType::Enum);
        let second = EntityInstance::new(inline(&run, "Player"))
            .with_field(inline(&run, "characterID"), VariableType::Enum)
            .with_field(inline(&run, "extra"), VariableType::Bool);

        run.process_batch(&[first, second]);
        let report = run.finish();

        assert_eq!(report.schemas.len(), 1);
        assert_eq!(
            report.schemas[0].fields,
            vec![FieldDescriptor::new("characterID", VariableType::Enum)]
        );
        // Later instances still feed the field name count
        assert_eq!(report.stats.distinct_field_names, 2);
        assert_eq!(report.stats.instances, 2);
    }

    #[test]
    fn test_unresolved_entity_type_uses_hex_key() {
        let mut run = aggregator();
        let digest = run.oracle().digest(b"Unknown");
        run.process(&EntityInstance::new(Symbol::hashed(digest)));
        run.process(&EntityInstance::new(Symbol::hashed(digest)));

        let report = run.finish();
        assert_eq!(report.schemas.len(), 1);
        assert_eq!(report.schemas[0].name, digest.to_hex());
        assert_eq!(report.unresolved, vec![digest.to_hex()]);
    }

    #[test]
    fn test_base_field_names_seeded() {
        let mut run = aggregator();
        let instance = EntityInstance::new(hashed(&run, "Ring"))
            .with_field(hashed(&run, "position"), VariableType::Vector2);
        run.process(&instance);

        let report = run.finish();
        assert!(report.unresolved.is_empty());
        assert!(report.schemas[0].fields.is_empty());
        assert_eq!(report.stats.dictionary_hits, 2);
    }

    #[test]
    fn test_strategies_and_parallelism_agree() {
        let build = |config: RunConfig| {
            let mut run = RunAggregator::new(config);
            run.seed(["Ring", "Player", "xPos", "Spring"]);
            let names = ["Ring", "Spring", "Missing", "Ring", "Player"];
            let instances: Vec<EntityInstance> = names
                .iter()
                .map(|name| {
                    EntityInstance::new(hashed(&run, name))
                        .with_field(hashed(&run, "xPos"), VariableType::Int32)
                        .with_field(hashed(&run, "nope"), VariableType::UInt8)
                })
                .collect();
            run.process_batch(&instances);
            let report = run.finish();
            (report.render(&RenderConfig::default()), report.unresolved, report.stats)
        };

        let baseline = build(RunConfig::new().parallel(false));
        for config in [
            RunConfig::new().parallel(true),
            RunConfig::new().strategy(ResolveStrategy::Indexed),
            RunConfig::new()
                .parallel(true)
                .strategy(ResolveStrategy::Indexed),
        ] {
            assert_eq!(build(config), baseline);
        }
        assert_eq!(baseline.2.entity_types, 4);
        assert_eq!(baseline.1.len(), 2);
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut run = aggregator();
        run.process(&EntityInstance::new(hashed(&run, "Player")));
        let report = run.finish();

        let output = temp_dir.path().join("out").join("entities.txt");
        report.write_to(&output, &RenderConfig::default()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "struct EntityPlayer {\n\tRSDK_ENTITY\n};\n\n"
        );

        // A regular file standing where a directory should be
        let blocked = output.join("entities.txt");
        let err = report
            .write_to(&blocked, &RenderConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_index_rebuilt_after_seed() {
        let mut run = RunAggregator::new(RunConfig::new().strategy(ResolveStrategy::Indexed));
        let spring = hashed(&run, "Spring");
        run.process(&EntityInstance::new(spring.clone()));
        run.seed(["Spring"]);
        run.process(&EntityInstance::new(spring));

        let report = run.finish();
        let names: Vec<_> = report.schemas.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[1], "Spring");
        assert_eq!(report.unresolved.len(), 1);
    }
}
