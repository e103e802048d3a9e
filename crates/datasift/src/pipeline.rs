//! The analysis pipeline and its public entry point.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::anomaly::{AnomalyDetector, AnomalyOutcome, DetectorConfig};
use crate::error::{DatasiftError, Result};
use crate::input::{Dataset, Parser, ParserConfig, RawRule, RuleSet, SourceMetadata};
use crate::llm::LlmProvider;
use crate::report::{AnalysisReport, ReportBuilder};
use crate::rules::{Interpretation, MatchOptions, RuleInterpreter, RuleValidator, ValidationOutcome};

/// Where a run is. Stages advance strictly in declaration order; any stage
/// may move to `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loaded,
    RulesInterpreted,
    Validated,
    AnomaliesDetected,
    Summarized,
    Errored,
}

impl Stage {
    fn next(&self) -> Option<Stage> {
        match self {
            Stage::Loaded => Some(Stage::RulesInterpreted),
            Stage::RulesInterpreted => Some(Stage::Validated),
            Stage::Validated => Some(Stage::AnomaliesDetected),
            Stage::AnomaliesDetected => Some(Stage::Summarized),
            Stage::Summarized | Stage::Errored => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Summarized | Stage::Errored)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Loaded => "loaded",
            Stage::RulesInterpreted => "rules_interpreted",
            Stage::Validated => "validated",
            Stage::AnomaliesDetected => "anomalies_detected",
            Stage::Summarized => "summarized",
            Stage::Errored => "errored",
        };
        f.write_str(label)
    }
}

/// Stage tracker for a single run.
#[derive(Debug)]
pub struct PipelineRun {
    stage: Stage,
}

impl PipelineRun {
    /// A run at the `Loaded` stage. A failed load is recorded with [`PipelineRun::fail`].
    pub fn start() -> Self {
        debug!(stage = %Stage::Loaded, "pipeline run started");
        Self {
            stage: Stage::Loaded,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `to`, which must be the stage directly after the current one.
    pub fn advance(&mut self, to: Stage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(DatasiftError::Internal(format!(
                "illegal stage transition {} -> {}",
                self.stage, to
            )));
        }
        debug!(from = %self.stage, to = %to, "stage transition");
        self.stage = to;
        Ok(())
    }

    /// Record a fatal error and hand it back.
    pub fn fail(&mut self, error: DatasiftError) -> DatasiftError {
        warn!(stage = %self.stage, error = %error, "pipeline run failed");
        self.stage = Stage::Errored;
        error
    }
}

/// A parsed dataset, its source metadata and its rules table.
type Inputs = (Dataset, SourceMetadata, RuleSet);

/// Configuration for an [`Analyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Parser configuration for the dataset.
    pub parser: ParserConfig,
    /// Cell matching options for the validator.
    pub matching: MatchOptions,
    /// Anomaly detector parameters.
    pub detector: DetectorConfig,
    /// Upper bound on the wait for the interpretation service.
    pub interpreter_timeout: Option<Duration>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            matching: MatchOptions::default(),
            detector: DetectorConfig::default(),
            interpreter_timeout: None,
        }
    }
}

/// Runs the full analysis: interpret rules, validate rows, detect anomalies,
/// build the report.
pub struct Analyzer {
    config: AnalyzerConfig,
    parser: Parser,
    llm_provider: Option<Arc<dyn LlmProvider>>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// An analyzer with default configuration and no interpretation service.
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::default())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        Self {
            config,
            parser,
            llm_provider: None,
        }
    }

    /// Use `provider` to interpret rules.
    pub fn with_llm(self, provider: impl LlmProvider + 'static) -> Self {
        self.with_shared_llm(Arc::new(provider))
    }

    /// Use an already shared provider to interpret rules.
    pub fn with_shared_llm(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm_provider = Some(provider);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a loaded dataset against raw rules.
    ///
    /// Interpretation problems and unevaluable rules degrade into report
    /// warnings. An empty dataset or a bad detector configuration fails the
    /// run, and no partial report is produced.
    pub fn analyze(
        &self,
        dataset: &Dataset,
        source: Option<SourceMetadata>,
        raw_rules: &[RawRule],
    ) -> Result<AnalysisReport> {
        self.run(PipelineRun::start(), dataset, source, raw_rules)
    }

    /// Parse both tables from text and analyze them.
    pub fn analyze_str(&self, data: &str, rules: &str) -> Result<AnalysisReport> {
        let mut run = PipelineRun::start();
        let (dataset, source, rule_set) = self.load_str(&mut run, data, rules)?;
        self.run(run, &dataset, Some(source), &rule_set.rules)
    }

    /// Load both tables from disk and analyze them.
    pub fn analyze_files(
        &self,
        data_path: impl AsRef<Path>,
        rules_path: impl AsRef<Path>,
    ) -> Result<AnalysisReport> {
        let mut run = PipelineRun::start();
        let (dataset, source, rule_set) = self.load_files(&mut run, data_path, rules_path)?;
        self.run(run, &dataset, Some(source), &rule_set.rules)
    }

    fn load_str(&self, run: &mut PipelineRun, data: &str, rules: &str) -> Result<Inputs> {
        let load = || -> Result<Inputs> {
            let (dataset, source) = self.parser.parse_str(data)?;
            Ok((dataset, source, RuleSet::parse_str(rules)?))
        };
        load().map_err(|e| run.fail(e))
    }

    fn load_files(
        &self,
        run: &mut PipelineRun,
        data_path: impl AsRef<Path>,
        rules_path: impl AsRef<Path>,
    ) -> Result<Inputs> {
        let load = || -> Result<Inputs> {
            let (dataset, source) = self.parser.parse_file(data_path)?;
            Ok((dataset, source, RuleSet::parse_file(rules_path)?))
        };
        load().map_err(|e| run.fail(e))
    }

    fn run(
        &self,
        mut run: PipelineRun,
        dataset: &Dataset,
        source: Option<SourceMetadata>,
        raw_rules: &[RawRule],
    ) -> Result<AnalysisReport> {
        if dataset.is_empty() {
            return Err(run.fail(DatasiftError::EmptyData(
                "Dataset has no rows to analyze".to_string(),
            )));
        }
        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            rules = raw_rules.len(),
            "starting analysis"
        );

        let interpretation = self.interpret(dataset, raw_rules);
        run.advance(Stage::RulesInterpreted)?;

        let validation = self.validate(dataset, &interpretation);
        run.advance(Stage::Validated)?;

        let anomalies = self.detect(dataset).map_err(|e| run.fail(e))?;
        run.advance(Stage::AnomaliesDetected)?;

        let report = ReportBuilder::new(dataset)
            .with_source(source)
            .with_detector_config(self.config.detector)
            .build(interpretation, validation, anomalies)
            .map_err(|e| run.fail(e))?;
        run.advance(Stage::Summarized)?;

        info!(
            violations = report.rule_violation_count,
            anomalies = report.anomaly_count,
            warnings = report.warnings.len(),
            "analysis complete"
        );
        Ok(report)
    }

    fn interpret(&self, dataset: &Dataset, raw_rules: &[RawRule]) -> Interpretation {
        let mut interpreter = match &self.llm_provider {
            Some(provider) => RuleInterpreter::new(Arc::clone(provider)),
            None => RuleInterpreter::without_service(),
        };
        if let Some(timeout) = self.config.interpreter_timeout {
            interpreter = interpreter.with_timeout(timeout);
        }
        let columns: Vec<String> = dataset.schema().names().map(str::to_string).collect();
        interpreter.interpret(raw_rules, &columns)
    }

    fn validate(&self, dataset: &Dataset, interpretation: &Interpretation) -> ValidationOutcome {
        RuleValidator::with_options(self.config.matching).validate(dataset, &interpretation.rules)
    }

    fn detect(&self, dataset: &Dataset) -> Result<AnomalyOutcome> {
        AnomalyDetector::new(self.config.detector)?.detect(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use crate::warning::WarningKind;

    const DATA: &str = "id,Amount\nA,10\nB,-5\nC,12\n";
    const RULES: &str = "description\nAmount must be positive\n";
    const POSITIVE: &str = r#"[{"rule_index": 0, "kind": "range", "columns": ["Amount"], "expected": {"min": 0, "min_inclusive": false}}]"#;

    #[test]
    fn test_stage_order_is_enforced() {
        let mut run = PipelineRun::start();
        assert!(run.advance(Stage::Validated).is_err());
        run.advance(Stage::RulesInterpreted).unwrap();
        run.advance(Stage::Validated).unwrap();
        run.advance(Stage::AnomaliesDetected).unwrap();
        run.advance(Stage::Summarized).unwrap();
        assert!(run.stage().is_terminal());
        assert!(run.advance(Stage::Summarized).is_err());
    }

    #[test]
    fn test_fail_moves_to_errored() {
        let mut run = PipelineRun::start();
        let error = run.fail(DatasiftError::EmptyData("x".into()));
        assert_eq!(run.stage(), Stage::Errored);
        assert!(matches!(error, DatasiftError::EmptyData(_)));
    }

    #[test]
    fn test_load_failure_moves_run_to_errored() {
        let analyzer = Analyzer::new();

        let mut run = PipelineRun::start();
        let error = analyzer
            .load_str(&mut run, "a,b\n1,2,3\n", RULES)
            .unwrap_err();
        assert!(matches!(error, DatasiftError::InvalidInput(_)));
        assert_eq!(run.stage(), Stage::Errored);

        let mut run = PipelineRun::start();
        let error = analyzer
            .load_files(&mut run, "/nonexistent/data.csv", "/nonexistent/rules.csv")
            .unwrap_err();
        assert!(matches!(error, DatasiftError::Io { .. }));
        assert_eq!(run.stage(), Stage::Errored);

        let mut run = PipelineRun::start();
        assert!(analyzer.load_str(&mut run, DATA, RULES).is_ok());
        assert_eq!(run.stage(), Stage::Loaded);
    }

    #[test]
    fn test_analyze_flags_negative_amount() {
        let analyzer = Analyzer::new().with_llm(MockProvider::with_response(POSITIVE));
        let report = analyzer.analyze_str(DATA, RULES).unwrap();

        assert_eq!(report.row_count, 3);
        assert_eq!(report.rule_violation_count, 1);
        assert!(report.rows[1].rule_violation);
        assert_eq!(report.rows[1].violation_justification, "Amount must be positive");
        assert_eq!(report.rows.len(), 3);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_service_failure_still_reports() {
        let analyzer = Analyzer::new().with_llm(MockProvider::failing("unreachable"));
        let report = analyzer.analyze_str(DATA, RULES).unwrap();

        assert_eq!(report.rule_violation_count, 0);
        assert_eq!(report.warnings[0].kind, WarningKind::InterpreterUnavailable);
        assert_eq!(report.rows.len(), 3);
    }

    #[test]
    fn test_no_provider_warns() {
        let report = Analyzer::new().analyze_str(DATA, RULES).unwrap();
        assert_eq!(report.warnings[0].kind, WarningKind::InterpreterUnavailable);
        assert_eq!(report.warnings[0].stage, Stage::RulesInterpreted);
    }

    #[test]
    fn test_header_only_dataset_is_fatal() {
        let result = Analyzer::new().analyze_str("id,Amount\n", RULES);
        assert!(matches!(result, Err(DatasiftError::EmptyData(_))));
    }

    #[test]
    fn test_bad_contamination_is_fatal() {
        let config = AnalyzerConfig {
            detector: DetectorConfig::default().with_contamination(1.5),
            ..AnalyzerConfig::default()
        };
        let result = Analyzer::with_config(config).analyze_str(DATA, RULES);
        assert!(matches!(result, Err(DatasiftError::InvalidInput(_))));
    }
}
