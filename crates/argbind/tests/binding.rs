use std::collections::BTreeSet;

use argbind::{App, ArgError, IsMember, MultiOptionPolicy, ParseOutcome, shared};

fn run(app: &mut App, tokens: &[&str]) -> argbind::Result<ParseOutcome> {
    app.run(tokens.iter().copied())
}

#[test]
fn help_shows_defaults_and_member_sets() {
    let mut app = App::new("My prog");
    let one = 1i32;
    let two = 2i32;
    app.add_option("--one", &one, "Help for one", true).unwrap();
    app.add_option("--set", &two, "Help for set", true)
        .unwrap()
        .check(IsMember::new([2, 3, 4]));

    let help = app.help();
    assert!(help.contains("--one"), "{help}");
    assert!(help.contains("--set"), "{help}");
    assert!(help.contains("1"), "{help}");
    assert!(help.contains("=2"), "{help}");
    assert!(help.contains("2,3,4"), "{help}");
}

#[test]
fn help_shows_vector_default_and_unbounded_arity() {
    let mut app = App::new("My prog");
    let x = vec![1, 2];
    app.add_option("-q,--quick", &x, "", true).unwrap();
    let help = app.help();
    assert!(help.contains("INT=[1,2] ..."), "{help}");
}

#[test]
fn help_keeps_member_spelling() {
    let mut app = App::new("My prog");
    let def = "One".to_string();
    app.add_option("--set", &def, "Help for set", true)
        .unwrap()
        .check(IsMember::new(["oNe", "twO", "THREE"]));
    let help = app.help();
    for needle in ["--set", "=One", "oNe", "twO", "THREE"] {
        assert!(help.contains(needle), "missing {needle}:\n{help}");
    }
}

#[test]
fn help_follows_live_set() {
    let vals = shared(BTreeSet::from([1, 2, 3]));
    let val = 2;
    let mut app = App::new("");
    app.add_option("--val", &val, "", true)
        .unwrap()
        .check(IsMember::live(&vals));

    let help = app.help();
    assert!(help.contains('1'), "{help}");
    assert!(!help.contains('4'), "{help}");

    vals.write().insert(4);
    vals.write().remove(&1);

    let help = app.help();
    assert!(!help.contains('1'), "{help}");
    assert!(help.contains('4'), "{help}");
}

#[test]
fn help_follows_live_caseless_set() {
    let vals = shared(BTreeSet::from([
        "1".to_string(),
        "2".to_string(),
        "3".to_string(),
    ]));
    let val = "2".to_string();
    let mut app = App::new("");
    let handle = app
        .add_option("--val", &val, "", true)
        .unwrap()
        .check(IsMember::live(&vals).ignore_case())
        .handle();

    let help = app.help();
    assert!(help.contains('1'), "{help}");
    assert!(!help.contains('4'), "{help}");

    vals.write().insert("4".to_string());
    vals.write().remove("1");

    let help = app.help();
    assert!(!help.contains('1'), "{help}");
    assert!(help.contains('4'), "{help}");

    run(&mut app, &["--val", "4"]).unwrap();
    assert_eq!(app.get(&handle).unwrap(), "4");
    let err = run(&mut app, &["--val", "1"]).unwrap_err();
    assert!(matches!(err, ArgError::Validation { .. }));
}

#[test]
fn inline_short_value_and_positional_fallback() {
    let mut app = App::new("prog");
    let i = 3i32;
    let s = "HI".to_string();
    let hi = app.add_option("-i,i", &i, "", false).unwrap().handle();
    let hs = app.add_option("-s,s", &s, "", true).unwrap().handle();

    run(&mut app, &["-i2", "9"]).unwrap();

    assert_eq!(app.count("i"), 1);
    assert_eq!(app.count("-s"), 1);
    assert_eq!(app.get(&hi).unwrap(), 2);
    assert_eq!(app.get(&hs).unwrap(), "9");
}

#[test]
fn fixed_vector_arity_with_default() {
    let mut app = App::new("prog");
    let strvec = vec!["one".to_string()];
    let opt = app
        .add_option("-s,--string", &strvec, "", true)
        .unwrap()
        .expected(3)
        .unwrap();
    assert_eq!(opt.get().get_expected(), 3);
    let handle = opt.handle();

    run(&mut app, &["--string", "mystring", "mystring2", "mystring3"]).unwrap();
    assert_eq!(app.count("--string"), 3);
    assert_eq!(
        app.get(&handle).unwrap(),
        vec!["mystring", "mystring2", "mystring3"]
    );
}

#[test]
fn defaulted_results_and_late_default_str() {
    let mut app = App::new("prog");
    let sval = "NA".to_string();
    let opts = app.add_option("--string", &sval, "", true).unwrap().handle();
    let optv = app.add_option_of::<i32>("--val", "").unwrap().handle();

    run(&mut app, &[]).unwrap();
    assert_eq!(app.get(&opts).unwrap(), "NA");
    assert_eq!(app.option(&opts).unwrap().count(), 0);
    assert!(matches!(
        app.get(&optv),
        Err(ArgError::Conversion { value: None, .. })
    ));

    app.option_mut(&optv).unwrap().default_str("442");
    assert_eq!(app.get(&optv).unwrap(), 442);
    assert_eq!(app.get(&optv).unwrap(), 442);
}

#[test]
fn unconvertible_value_only_fails_its_own_results() {
    let mut app = App::new("prog");
    let n = app.add_option_of::<i32>("--n", "").unwrap().handle();
    let s = app.add_option_of::<String>("--s", "").unwrap().handle();

    assert_eq!(run(&mut app, &["--n", "abc", "--s", "ok"]).unwrap(), ParseOutcome::Parsed);
    assert_eq!(app.count("--n"), 1);
    match app.get(&n) {
        Err(ArgError::Conversion { option, value, .. }) => {
            assert_eq!(option, "--n");
            assert_eq!(value.as_deref(), Some("abc"));
        }
        other => panic!("expected a conversion error, got {other:?}"),
    }
    assert_eq!(app.get(&s).unwrap(), "ok");
    assert_eq!(app.get(&n).unwrap_err().exit_code(), 104);
}

#[test]
fn repeated_scalar_is_a_mismatch() {
    let mut app = App::new("prog");
    let someint = 2;
    app.add_option("-a", &someint, "", true).unwrap();
    let err = run(&mut app, &["-a1", "-a2"]).unwrap_err();
    assert!(matches!(err, ArgError::ArgumentMismatch { .. }), "{err}");
    assert_eq!(err.exit_code(), 114);
}

#[test]
fn repeated_scalar_with_take_last() {
    let mut app = App::new("prog");
    let h = app
        .add_option_of::<i32>("-a", "")
        .unwrap()
        .multi_option_policy(MultiOptionPolicy::TakeLast)
        .handle();
    run(&mut app, &["-a1", "-a2"]).unwrap();
    assert_eq!(app.get(&h).unwrap(), 2);
}

#[test]
fn delimiter_split_survives_remove_and_readd() {
    let mut app = App::new("prog");
    let vals: Vec<i32> = Vec::new();

    let h = app
        .add_option("--idx", &vals, "", false)
        .unwrap()
        .delimiter(',')
        .unwrap()
        .handle();
    run(&mut app, &["--idx", "1,2,3"]).unwrap();
    assert_eq!(app.get(&h).unwrap(), vec![1, 2, 3]);

    assert!(app.remove_option(&h));
    let h = app
        .add_option("--idx", &vals, "", true)
        .unwrap()
        .delimiter(',')
        .unwrap()
        .handle();
    run(&mut app, &["--idx", "1,2,3"]).unwrap();
    assert_eq!(app.get(&h).unwrap(), vec![1, 2, 3]);
}

#[test]
fn trailing_delimiter_is_dropped() {
    let mut app = App::new("prog");
    let vals: Vec<i32> = Vec::new();
    let h = app
        .add_option("--idx", &vals, "", false)
        .unwrap()
        .delimiter(',')
        .unwrap()
        .handle();
    run(&mut app, &["--idx", "1,2,"]).unwrap();
    assert_eq!(app.get(&h).unwrap(), vec![1, 2]);

    app.remove_option(&h);
    let h = app
        .add_option("--idx", &vals, "", true)
        .unwrap()
        .delimiter(',')
        .unwrap()
        .handle();
    run(&mut app, &["--idx", "1,2,"]).unwrap();
    assert_eq!(app.get(&h).unwrap(), vec![1, 2]);
}

#[test]
fn delimited_pieces_are_trimmed() {
    let mut app = App::new("prog");
    let vals: Vec<i32> = Vec::new();
    let h = app
        .add_option("--idx", &vals, "", true)
        .unwrap()
        .delimiter(',')
        .unwrap()
        .handle();
    run(&mut app, &["--idx", "1,    2"]).unwrap();
    assert_eq!(app.get(&h).unwrap(), vec![1, 2]);

    app.remove_option(&h);
    let h = app
        .add_option("--idx", &vals, "", false)
        .unwrap()
        .delimiter(',')
        .unwrap()
        .handle();
    run(&mut app, &["--idx", "1,    2"]).unwrap();
    assert_eq!(app.get(&h).unwrap(), vec![1, 2]);
}

#[test]
fn unbounded_positional_takes_everything() {
    let mut app = App::new("prog");
    let bar: Vec<String> = Vec::new();
    let tokens = ["this", "is", "a", "test"];

    let h = app.add_option("bar", &bar, "bar", false).unwrap().handle();
    run(&mut app, &tokens).unwrap();
    assert_eq!(app.get(&h).unwrap(), tokens);

    app.remove_option(&h);
    let h = app.add_option("bar", &bar, "bar", true).unwrap().handle();
    run(&mut app, &tokens).unwrap();
    assert_eq!(app.get(&h).unwrap(), tokens);
}

#[test]
fn results_are_idempotent_between_runs() {
    let mut app = App::new("prog");
    let h = app.add_option_of::<Vec<u32>>("--n", "").unwrap().handle();
    run(&mut app, &["--n", "4", "5"]).unwrap();
    let first = app.get(&h).unwrap();
    let second = app.get(&h).unwrap();
    assert_eq!(first, second);
    assert_eq!(app.option(&h).unwrap().raw_results(), &["4", "5"]);
}

#[test]
fn rerun_clears_previous_state() {
    let mut app = App::new("prog");
    app.add_flag("-v", "").unwrap();
    app.add_subcommand("sub", "").unwrap();
    run(&mut app, &["-v", "extra", "sub"]).unwrap();
    assert_eq!(app.count("-v"), 1);
    assert_eq!(app.extras(), &["extra"]);
    assert!(app.got_subcommand("sub"));

    run(&mut app, &[]).unwrap();
    assert_eq!(app.count("-v"), 0);
    assert!(app.extras().is_empty());
    assert!(app.selected_subcommand().is_none());
}

#[test]
fn subcommand_dispatch_and_nested_results() {
    let mut app = App::new("git");
    let verbose = app.add_flag("-v,--verbose", "").unwrap().handle();
    let remote = app.add_subcommand("remote", "Manage remotes").unwrap();
    remote.add_subcommand("add", "Add a remote").unwrap();
    let add = remote.alias_subcommand("add", "a").unwrap();
    let name = add.add_option_of::<String>("name", "").unwrap().required().handle();
    let url = add.add_option_of::<String>("url", "").unwrap().required().handle();

    run(&mut app, &["-v", "remote", "a", "origin", "https://example.invalid/r.git"]).unwrap();
    assert!(app.get(&verbose).unwrap());
    assert!(app.got_subcommand("remote"));
    let remote = app.selected_subcommand().unwrap();
    assert!(remote.got_subcommand("add"));
    assert_eq!(app.get(&name).unwrap(), "origin");
    assert_eq!(app.get(&url).unwrap(), "https://example.invalid/r.git");
}

#[test]
fn subcommand_help_propagates() {
    let mut app = App::new("tool");
    app.add_subcommand("build", "Build the project")
        .unwrap()
        .add_option_of::<String>("--target", "Target triple")
        .unwrap()
        .required();

    match run(&mut app, &["build", "--help"]).unwrap() {
        ParseOutcome::Help(text) => {
            assert!(text.starts_with("build - Build the project"), "{text}");
            assert!(text.contains("--target TEXT REQUIRED"), "{text}");
        }
        other => panic!("expected help, got: {other:?}"),
    }

    match run(&mut app, &["--help", "build"]).unwrap() {
        ParseOutcome::Help(text) => assert!(text.contains("Subcommands:"), "{text}"),
        other => panic!("expected help, got: {other:?}"),
    }
}

#[test]
fn missing_required_subcommand() {
    let mut app = App::new("tool");
    app.require_subcommand(true);
    app.add_subcommand("build", "").unwrap();
    let err = run(&mut app, &[]).unwrap_err();
    assert_eq!(
        err,
        ArgError::RequiredSubcommand {
            app: "tool".to_string()
        }
    );
}

#[test]
fn env_value_is_split_and_validated() {
    let mut app = App::new("prog");
    let h = app
        .add_option_of::<Vec<i32>>("--ids", "")
        .unwrap()
        .delimiter(',')
        .unwrap()
        .envname("IDS")
        .check(argbind::Validator::positive_number())
        .handle();

    let env = vec![("IDS".to_string(), "3,4".to_string())];
    app.run_with_env(Vec::<String>::new(), &env).unwrap();
    assert_eq!(app.get(&h).unwrap(), vec![3, 4]);

    let env = vec![("IDS".to_string(), "3,-4".to_string())];
    let err = app.run_with_env(Vec::<String>::new(), &env).unwrap_err();
    assert!(matches!(err, ArgError::Validation { .. }));
}

#[test]
fn version_flag() {
    let mut app = App::new("tool");
    app.set_version_flag("-V,--version", "2.0.0").unwrap();
    assert_eq!(
        run(&mut app, &["-V"]).unwrap(),
        ParseOutcome::Version("tool 2.0.0\n".to_string())
    );
}
