//! Property-based tests for last-writer-wins option resolution

use mir::options::{InitOption, InitOpts, Options, RunMode};
use proptest::prelude::*;
use std::path::PathBuf;

fn run_mode_strategy() -> impl Strategy<Value = RunMode> {
    prop_oneof![
        Just(RunMode::Serial),
        Just(RunMode::SerialDebug),
        Just(RunMode::Concurrent),
        Just(RunMode::ConcurrentDebug),
    ]
}

fn option_strategy() -> impl Strategy<Value = InitOption> {
    prop_oneof![
        run_mode_strategy().prop_map(InitOption::RunMode),
        "[a-z]{1,8}".prop_map(InitOption::GeneratorName),
        "[a-z]{1,8}".prop_map(InitOption::ParserName),
        "[a-z/]{1,12}".prop_map(|p| InitOption::SinkPath(PathBuf::from(p))),
        "[a-z]{0,6}".prop_map(InitOption::DefaultTag),
        any::<bool>().prop_map(InitOption::NoneQuery),
        any::<bool>().prop_map(InitOption::Cleanup),
    ]
}

/// Field-by-field expectation: the last option touching a field decides it.
fn expected(options: &[InitOption]) -> InitOpts {
    let mut opts = InitOpts::default();
    let last = |pick: &dyn Fn(&InitOption) -> bool| options.iter().rev().find(|o| pick(o)).cloned();

    if let Some(InitOption::RunMode(mode)) = last(&|o| matches!(o, InitOption::RunMode(_))) {
        opts.run_mode = mode;
    }
    if let Some(InitOption::GeneratorName(name)) = last(&|o| matches!(o, InitOption::GeneratorName(_))) {
        opts.generator_name = name;
    }
    if let Some(InitOption::ParserName(name)) = last(&|o| matches!(o, InitOption::ParserName(_))) {
        opts.parser_name = name;
    }
    if let Some(InitOption::SinkPath(path)) = last(&|o| matches!(o, InitOption::SinkPath(_))) {
        opts.sink_path = path;
    }
    if let Some(InitOption::DefaultTag(tag)) = last(&|o| matches!(o, InitOption::DefaultTag(_))) {
        opts.default_tag = tag;
    }
    if let Some(InitOption::NoneQuery(enable)) = last(&|o| matches!(o, InitOption::NoneQuery(_))) {
        opts.none_query = enable;
    }
    if let Some(InitOption::Cleanup(enable)) = last(&|o| matches!(o, InitOption::Cleanup(_))) {
        opts.cleanup = enable;
    }
    opts
}

proptest! {
    #[test]
    fn test_last_option_per_field_wins(options in prop::collection::vec(option_strategy(), 0..16)) {
        let resolved = Options::from(options.clone()).init_opts();
        prop_assert_eq!(resolved, expected(&options));
    }

    #[test]
    fn test_repeating_an_option_is_idempotent(option in option_strategy(), times in 1usize..5) {
        let once = Options::from(vec![option.clone()]).init_opts();
        let repeated = Options::from(vec![option; times]).init_opts();
        prop_assert_eq!(once, repeated);
    }
}

#[test]
fn test_empty_options_yield_documented_defaults() {
    let opts = Options::new().init_opts();
    assert_eq!(opts.run_mode, RunMode::Serial);
    assert_eq!(opts.parser_name, "structTag");
    assert_eq!(opts.sink_path, PathBuf::from(".gen"));
    assert_eq!(opts.default_tag, "mir");
    assert!(opts.cleanup);
}
