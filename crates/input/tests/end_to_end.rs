//! End-to-end runs through the public entry points

use std::fs;
use std::io::{Seek, Write};
use std::os::fd::OwnedFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use xs_input::{
    BufferSink, EditorRead, HistoryLog, Input, InputConfig, LineReader, Namespace, RunFlags,
    Signal, Tree, Value, completion, true_value,
};

/// Evaluator that records every tree and answers `false` with false
#[derive(Default)]
struct Recorder {
    trees: Vec<Tree>,
    depths: Vec<usize>,
}

impl xs_input::Evaluator for Recorder {
    fn eval(&mut self, tree: &Tree, input: &mut Input) -> Result<Value, Signal> {
        self.trees.push(tree.clone());
        self.depths.push(input.depth());
        if let Tree::Command(words) = tree {
            match words[0].as_str() {
                "false" => return Ok(vec!["1".to_string()]),
                "nested" => {
                    let text = words[1..].join(" ");
                    return input.run_from_string(&text, Some("nested"), RunFlags::empty(), self);
                }
                _ => {}
            }
        }
        Ok(true_value())
    }
}

fn quiet_input() -> Input {
    Input::new(InputConfig::new()).with_diagnostics(BufferSink::new())
}

#[test]
fn test_echo_hi_runs_one_two_word_command() {
    let mut input = quiet_input();
    let mut rec = Recorder::default();
    let value = input
        .run_from_string("echo hi\n", None, RunFlags::empty(), &mut rec)
        .unwrap();
    assert_eq!(value, true_value());
    assert_eq!(
        rec.trees,
        vec![Tree::Command(vec!["echo".to_string(), "hi".to_string()])]
    );
    assert_eq!(input.depth(), 0);
}

static GRAMMAR_CALLS: AtomicUsize = AtomicUsize::new(0);

fn counting_grammar(input: &mut Input) -> Result<Option<Tree>, Signal> {
    GRAMMAR_CALLS.fetch_add(1, Ordering::SeqCst);
    xs_input::grammar::parse_line(input)
}

#[test]
fn test_empty_text_is_end_of_input_without_running_the_grammar() {
    let mut input = quiet_input().with_grammar(counting_grammar);
    let mut rec = Recorder::default();
    let value = input
        .run_from_string("", None, RunFlags::empty(), &mut rec)
        .unwrap();
    assert_eq!(value, true_value());
    assert!(rec.trees.is_empty());
    assert_eq!(GRAMMAR_CALLS.load(Ordering::SeqCst), 0);
}

#[test]
fn test_descriptor_source_from_file() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(b"# setup\necho 'a b'; false\n\ntrue\n").unwrap();
    file.rewind().unwrap();

    let mut input = quiet_input();
    let mut rec = Recorder::default();
    let value = input
        .run_from_descriptor(OwnedFd::from(file), Some("setup.xs"), RunFlags::empty(), &mut rec)
        .unwrap();

    assert_eq!(rec.trees.len(), 2);
    assert_eq!(rec.trees[0].to_string(), "echo 'a b'; false");
    assert_eq!(value, true_value());
}

#[test]
fn test_descriptor_read_error_is_fatal_and_unwinds() {
    let dir = tempfile::tempdir().unwrap();
    let file = fs::File::open(dir.path()).unwrap();

    let mut input = quiet_input();
    let mut rec = Recorder::default();
    let err = input
        .run_from_descriptor(OwnedFd::from(file), Some("dirsrc"), RunFlags::empty(), &mut rec)
        .unwrap_err();

    match err {
        Signal::Error { origin, message } => {
            assert_eq!(origin, "$&fdfill");
            assert!(message.starts_with("dirsrc: "), "message: {}", message);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(rec.trees.is_empty());
    assert_eq!(input.depth(), 0);
}

#[test]
fn test_nested_sources_unwind_in_order() {
    let mut input = quiet_input();
    let mut rec = Recorder::default();
    input
        .run_from_string("nested echo inner\necho outer\n", None, RunFlags::empty(), &mut rec)
        .unwrap();

    let shown: Vec<String> = rec.trees.iter().map(|t| t.to_string()).collect();
    assert_eq!(shown, vec!["nested echo inner", "echo inner", "echo outer"]);
    assert_eq!(rec.depths, vec![1, 2, 1]);
    assert_eq!(input.depth(), 0);
}

#[test]
fn test_parse_error_names_the_source() {
    let mut input = quiet_input();
    let mut rec = Recorder::default();
    let err = input
        .run_from_string("echo ok\necho 'open\n", Some("script"), RunFlags::empty(), &mut rec)
        .unwrap_err();
    match err {
        Signal::Error { origin, message } => {
            assert_eq!(origin, "$&parse");
            assert!(message.starts_with("script:1-2:"), "{}", message);
            assert!(message.ends_with("eof in quoted string"), "{}", message);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(rec.trees.len(), 1);
}

#[test]
fn test_print_commands_goes_to_the_sink() {
    let sink = BufferSink::new();
    let mut input = Input::new(InputConfig::new()).with_diagnostics(sink.clone());
    let mut rec = Recorder::default();
    input
        .run_from_string("echo 'x y'\n", None, RunFlags::PRINT_COMMANDS, &mut rec)
        .unwrap();
    assert_eq!(sink.lines(), vec!["echo 'x y'"]);
    assert_eq!(rec.trees.len(), 1);
}

#[test]
fn test_echo_input_reproduces_the_script() {
    let sink = BufferSink::new();
    let mut input = Input::new(InputConfig::new()).with_diagnostics(sink.clone());
    let mut rec = Recorder::default();
    let script = "echo one;echo two\n# done\n";
    input
        .run_from_string(script, None, RunFlags::ECHO_INPUT, &mut rec)
        .unwrap();
    assert_eq!(sink.echoed(), script.as_bytes());
}

struct Fixture {
    path: Vec<PathBuf>,
    names: Vec<String>,
}

impl Namespace for Fixture {
    fn search_path(&self) -> Vec<PathBuf> {
        self.path.clone()
    }

    fn names(&self) -> Vec<String> {
        self.names.clone()
    }
}

#[test]
fn test_completion_searches_path_in_order() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    fs::write(a.path().join("foo"), "").unwrap();
    fs::write(b.path().join("foobar"), "").unwrap();
    let cwd = tempfile::tempdir().unwrap();

    let namespace = Fixture {
        path: vec![a.path().to_path_buf(), b.path().to_path_buf()],
        names: vec!["foo".to_string()],
    };
    let found = completion::complete("fo", &namespace, cwd.path()).unwrap();
    assert_eq!(found.candidates, vec!["foo", "foobar"]);
    assert_eq!(found.into_list(), vec!["foo", "foo", "foobar"]);
}

/// Recall memory stand-in for a second shell sharing the history file
#[derive(Default)]
struct Recall(Vec<String>);

impl LineReader for Recall {
    fn read_line(&mut self, _prompt: &str) -> EditorRead {
        EditorRead::Eof
    }

    fn add_recall(&mut self, line: &str) {
        self.0.push(line.to_string());
    }
}

#[test]
fn test_history_shared_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    let mut sink = BufferSink::new();

    let mut writer = HistoryLog::new(Some(path.clone()), true);
    let mut reader = HistoryLog::new(Some(path.clone()), true);
    let mut recall = Recall::default();

    writer.log(b"echo first\n", &mut sink);
    reader.sync(&mut recall);
    writer.log(b"echo second\n", &mut sink);
    reader.sync(&mut recall);
    assert_eq!(recall.0, vec!["echo first", "echo second"]);

    // Another shell truncates the file: the reader starts over.
    fs::write(&path, "echo fresh\n").unwrap();
    reader.sync(&mut recall);
    assert_eq!(recall.0.last().map(String::as_str), Some("echo fresh"));
    assert_eq!(reader.watermark(), 1);
}

#[test]
fn test_unwritable_history_disables_logging() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("history");
    let sink = BufferSink::new();
    let mut writer_sink = sink.clone();

    let mut log = HistoryLog::new(Some(path), true);
    log.log(b"echo lost\n", &mut writer_sink);
    log.log(b"echo lost again\n", &mut writer_sink);

    assert_eq!(sink.lines().len(), 1);
    assert!(sink.lines()[0].starts_with("history("));
    assert!(log.path().is_none());
}
