//! Integration tests for engine runs across all four run modes

use super::test_utils::{group_entries, with_env_vars, GroupParser, RecordingGenerator};
use mir::config::ConfigLoader;
use mir::options::{self, RunMode};
use mir::{Engine, Generator, MirError, Options, Parser, PluginKind, PluginRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const ALL_MODES: [RunMode; 4] = [
    RunMode::Serial,
    RunMode::SerialDebug,
    RunMode::Concurrent,
    RunMode::ConcurrentDebug,
];

fn registry(parser: GroupParser, generator: RecordingGenerator) -> Arc<PluginRegistry> {
    let registry = Arc::new(PluginRegistry::new());
    registry.register_parsers([Arc::new(parser) as Arc<dyn Parser>]);
    registry.register_generators([Arc::new(generator) as Arc<dyn Generator>]);
    registry
}

fn expected_groups(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("g{i}")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_every_mode_delivers_all_descriptors_in_order() {
    for mode in ALL_MODES {
        let generator = RecordingGenerator::named("gin");
        let engine = Engine::new(registry(GroupParser::named("structTag"), generator.clone()))
            .with_capacity(2);
        let opts = Options::new().with(options::run_mode(mode));

        let res = engine.generate(group_entries(25), Some(&opts)).await;
        assert_eq!(res, Ok(()), "mode {mode}");
        assert_eq!(generator.seen(), expected_groups(25), "mode {mode}");
    }
}

#[tokio::test]
async fn test_defaults_resolve_struct_tag_and_gin() {
    let parser = GroupParser::named("structTag");
    let generator = RecordingGenerator::named("gin");
    let engine = Engine::new(registry(parser.clone(), generator.clone()));

    assert_eq!(engine.generate(group_entries(2), None).await, Ok(()));
    assert_eq!(generator.seen(), expected_groups(2));
    // Per-run clones share the recorders of the registered instance.
    assert_eq!(parser.tag.lock().clone(), Some("mir".to_string()));
    assert_eq!(generator.sink.lock().clone(), Some(PathBuf::from(".gen")));
}

#[tokio::test]
async fn test_named_plugins_and_options_reach_init() {
    let parser = GroupParser::named("custom");
    let generator = RecordingGenerator::named("chi");
    let engine = Engine::new(registry(parser.clone(), generator.clone()));
    let opts = Options::from(vec![
        options::parser_name("custom"),
        options::generator_name("chi"),
        options::default_tag("route"),
        options::sink_path("/out"),
    ]);

    assert_eq!(engine.generate(group_entries(1), Some(&opts)).await, Ok(()));
    assert_eq!(parser.tag.lock().clone(), Some("route".to_string()));
    assert_eq!(generator.sink.lock().clone(), Some(PathBuf::from("/out")));
}

#[tokio::test]
async fn test_missing_parser_is_not_replaced_by_default() {
    let engine = Engine::new(registry(
        GroupParser::named("structTag"),
        RecordingGenerator::named("gin"),
    ));
    let opts = Options::new().with(options::parser_name("yaml"));
    assert_eq!(
        engine.generate(group_entries(1), Some(&opts)).await,
        Err(MirError::plugin_not_found(PluginKind::Parser, "yaml"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_generator_failure_reaches_caller() {
    let err_x = MirError::Generate("write failed".to_string());
    let mut generator = RecordingGenerator::named("gin");
    generator.fail_after = Some((1, err_x.clone()));
    let parser = GroupParser::named("structTag");
    let engine = Engine::new(registry(parser.clone(), generator.clone())).with_capacity(1);
    let opts = Options::new().with(options::run_mode(RunMode::Concurrent));

    let res = tokio::time::timeout(
        Duration::from_secs(5),
        engine.generate(group_entries(50), Some(&opts)),
    )
    .await
    .expect("run must not hang");
    assert_eq!(res, Err(err_x));
    assert_eq!(generator.seen(), vec!["g0".to_string()]);
    assert!(*parser.sent.lock() < 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parser_failure_reported_in_both_modes() {
    for mode in [RunMode::Serial, RunMode::Concurrent] {
        let mut parser = GroupParser::named("structTag");
        parser.fail_at = Some(3);
        let generator = RecordingGenerator::named("gin");
        let engine = Engine::new(registry(parser, generator.clone()));
        let opts = Options::new().with(options::run_mode(mode));

        let res = engine.generate(group_entries(10), Some(&opts)).await;
        assert_eq!(res, Err(MirError::Parse("bad entry 3".to_string())), "mode {mode}");
        if mode == RunMode::Serial {
            assert!(generator.seen().is_empty());
        }
    }
}

#[tokio::test]
async fn test_engine_timeout_cancels_stalled_run() {
    struct Stall;

    impl mir::Plugin for Stall {
        fn name(&self) -> &str {
            "stall"
        }
    }

    #[async_trait::async_trait]
    impl Parser for Stall {
        fn init(&mut self, _opts: &mir::options::ParserOpts) -> Result<(), MirError> {
            Ok(())
        }

        fn parse(&self, _entries: &[mir::Entry]) -> Result<mir::Descriptors, MirError> {
            Ok(Vec::new())
        }

        async fn parse_context(&self, ctx: mir::ExecutionContext, _entries: Vec<mir::Entry>) {
            ctx.cancelled().await;
            ctx.parser_done();
        }

        fn clone_parser(&self) -> Box<dyn Parser> {
            Box::new(Stall)
        }
    }

    let registry = Arc::new(PluginRegistry::new());
    registry.register_parsers([Arc::new(Stall) as Arc<dyn Parser>]);
    registry.register_generators([Arc::new(RecordingGenerator::named("gin")) as Arc<dyn Generator>]);
    let engine = Engine::new(registry).with_timeout(Duration::from_millis(50));
    let opts = Options::from(vec![
        options::parser_name("stall"),
        options::run_mode(RunMode::Concurrent),
    ]);

    let res = tokio::time::timeout(Duration::from_secs(5), engine.generate(Vec::new(), Some(&opts)))
        .await
        .expect("timeout should end the run");
    assert_eq!(res, Err(MirError::DeadlineExceeded));
}

#[tokio::test]
async fn test_config_file_drives_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("mir.toml");
    std::fs::write(
        &path,
        "[generation]\nrun_mode = \"concurrent\"\ngenerator = \"echo\"\nchannel_capacity = 0\n",
    )
    .unwrap();
    let config = with_env_vars(&[], || ConfigLoader::load_from_file(&path)).unwrap();

    let generator = RecordingGenerator::named("echo");
    let engine = Engine::from_config(
        registry(GroupParser::named("structTag"), generator.clone()),
        &config,
    );
    assert_eq!(engine.capacity(), 0);

    let opts = config.options_with(Options::new().with(options::sink_path("api")));
    assert_eq!(engine.generate(group_entries(5), Some(&opts)).await, Ok(()));
    assert_eq!(generator.seen(), expected_groups(5));
    assert_eq!(generator.sink.lock().clone(), Some(PathBuf::from("api")));
}

#[test]
fn test_environment_overrides_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("mir.toml");
    std::fs::write(&path, "[generation]\ngenerator = \"echo\"\ncleanup = true\n").unwrap();

    let config = with_env_vars(
        &[
            ("MIR_GENERATION__GENERATOR", "fiber"),
            ("MIR_GENERATION__CLEANUP", "false"),
        ],
        || ConfigLoader::load_from_file(&path),
    )
    .unwrap();

    let opts = config.generation.options().init_opts();
    assert_eq!(opts.generator_name, "fiber");
    assert!(!opts.cleanup);
}
