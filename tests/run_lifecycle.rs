mod common;
use crate::common::{RecordingListener, ScriptedLauncher, fast_settings, init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use webcli::errors::WebcliError;
use webcli::registry::Registry;
use webcli::run::{RunSettings, Verbatim};
use webcli::types::RunStatus;

fn job(path: &str) -> Vec<String> {
    vec![path.to_string()]
}

#[tokio::test]
async fn clean_exit_completes_with_formatted_log() {
    init_tracing();
    let launcher = ScriptedLauncher::new().output("hello\n");
    let registry = Registry::new(launcher.clone(), fast_settings());

    let id = registry.start(job("jobs/hello")).unwrap();
    let rec = RecordingListener::new();
    let attach = registry.subscribe(&id, "s1", rec.listener()).unwrap();
    assert!(!attach.finished);
    assert_eq!(attach.backlog, "");

    let run = registry.get(&id).unwrap();
    let status = with_timeout(run.wait()).await;

    assert_eq!(status, RunStatus::Completed);
    assert_eq!(registry.logs(&id).unwrap(), "hello<br>");
    assert_eq!(
        rec.deliveries(),
        vec![("hello<br>".to_string(), false), (String::new(), true)]
    );
    assert!(run.ended_at().is_some());
    assert_eq!(launcher.launched(), vec![vec!["jobs", "hello"]]);
}

#[tokio::test]
async fn cancel_mid_run_ends_canceled_with_prior_output_only() {
    init_tracing();
    let launcher = ScriptedLauncher::new().output("before\n").hang();
    let registry = Registry::new(launcher, fast_settings());

    let id = registry.start(job("jobs/forever")).unwrap();
    let rec = RecordingListener::new();
    registry.subscribe(&id, "s1", rec.listener()).unwrap();

    with_timeout(async {
        while rec.text().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(registry.cancel(&id).unwrap());
    let run = registry.get(&id).unwrap();
    assert_eq!(with_timeout(run.wait()).await, RunStatus::Canceled);

    assert_eq!(run.logs(), "before<br>");
    assert_eq!(rec.terminal_count(), 1);
    assert_eq!(rec.deliveries().last(), Some(&(String::new(), true)));
}

#[tokio::test]
async fn cancel_on_finished_run_is_a_no_op() {
    let registry = Registry::new(ScriptedLauncher::new().output("done\n"), fast_settings());
    let id = registry.start(job("jobs/quick")).unwrap();
    let run = registry.get(&id).unwrap();
    assert_eq!(with_timeout(run.wait()).await, RunStatus::Completed);

    let ended = run.ended_at();
    assert!(!registry.cancel(&id).unwrap());
    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(run.ended_at(), ended);
}

#[tokio::test]
async fn two_subscribers_see_identical_sequences() {
    init_tracing();
    let launcher = ScriptedLauncher::new()
        .output("a\n")
        .pause(Duration::from_millis(5))
        .output("b")
        .pause(Duration::from_millis(5))
        .output("c\n");
    let registry = Registry::new(launcher, fast_settings());

    let id = registry.start(job("jobs/abc")).unwrap();
    let first = RecordingListener::new();
    let second = RecordingListener::new();
    registry.subscribe(&id, "first", first.listener()).unwrap();
    registry.subscribe(&id, "second", second.listener()).unwrap();

    let run = registry.get(&id).unwrap();
    with_timeout(run.wait()).await;

    assert_eq!(first.deliveries(), second.deliveries());
    assert_eq!(first.text(), "a<br>bc<br>");
    assert_eq!(first.terminal_count(), 1);
}

#[tokio::test]
async fn empty_arguments_create_nothing() {
    let launcher = ScriptedLauncher::new().output("never\n");
    let registry = Registry::new(launcher.clone(), fast_settings());

    let err = registry.start(Vec::new()).unwrap_err();

    assert!(matches!(err, WebcliError::InvalidArguments(_)));
    assert!(registry.is_empty());
    assert!(launcher.launched().is_empty());
}

#[tokio::test]
async fn read_error_fails_run_with_error_text() {
    let launcher = ScriptedLauncher::new().output("partial\n").fail("pipe broke");
    let registry = Registry::new(launcher, fast_settings());

    let id = registry.start(job("jobs/flaky")).unwrap();
    let rec = RecordingListener::new();
    registry.subscribe(&id, "s1", rec.listener()).unwrap();

    let run = registry.get(&id).unwrap();
    assert_eq!(with_timeout(run.wait()).await, RunStatus::Failed);
    assert_eq!(run.logs(), "partial<br>pipe broke");
    assert_eq!(rec.deliveries().last(), Some(&("pipe broke".to_string(), true)));
}

#[tokio::test]
async fn start_returns_before_the_run_finishes() {
    let registry = Registry::new(ScriptedLauncher::new().hang(), fast_settings());

    let id = registry.start(job("jobs/forever")).unwrap();

    let run = registry.get(&id).unwrap();
    assert_eq!(run.status(), RunStatus::Running);
    assert!(run.ended_at().is_none());
    assert!(registry.cancel(&id).unwrap());
    assert_eq!(with_timeout(run.wait()).await, RunStatus::Canceled);
}

#[tokio::test]
async fn logs_grow_monotonically_and_freeze_after_the_end() {
    let launcher = ScriptedLauncher::new()
        .output("1\n")
        .pause(Duration::from_millis(10))
        .output("2\n")
        .pause(Duration::from_millis(10))
        .output("3\n");
    let registry = Registry::new(launcher, fast_settings());
    let id = registry.start(job("jobs/count")).unwrap();
    let run = registry.get(&id).unwrap();

    let mut previous = String::new();
    with_timeout(async {
        while !run.status().is_terminal() {
            let current = run.logs();
            assert!(current.starts_with(&previous));
            previous = current;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;

    let frozen = run.logs();
    assert_eq!(frozen, "1<br>2<br>3<br>");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(run.logs(), frozen);
}

#[tokio::test]
async fn late_subscriber_gets_backlog_and_no_deliveries() {
    let registry = Registry::new(ScriptedLauncher::new().output("all\n"), fast_settings());
    let id = registry.start(job("jobs/quick")).unwrap();
    let run = registry.get(&id).unwrap();
    with_timeout(run.wait()).await;

    let rec = RecordingListener::new();
    let attach = registry.subscribe(&id, "late", rec.listener()).unwrap();

    assert!(attach.finished);
    assert_eq!(attach.backlog, "all<br>");
    assert_eq!(run.subscriber_count(), 0);
    assert!(rec.deliveries().is_empty());
}

#[tokio::test]
async fn unsubscribed_listener_receives_nothing_more() {
    let launcher = ScriptedLauncher::new()
        .pause(Duration::from_millis(20))
        .output("after\n");
    let registry = Registry::new(launcher, fast_settings());
    let id = registry.start(job("jobs/slow")).unwrap();

    let rec = RecordingListener::new();
    registry.subscribe(&id, "s1", rec.listener()).unwrap();
    assert!(registry.unsubscribe(&id, "s1").unwrap());
    assert!(!registry.unsubscribe(&id, "s1").unwrap());

    let run = registry.get(&id).unwrap();
    assert_eq!(with_timeout(run.wait()).await, RunStatus::Completed);
    assert!(rec.deliveries().is_empty());
    assert_eq!(run.logs(), "after<br>");
}

#[tokio::test]
async fn resubscribing_under_the_same_id_replaces_the_listener() {
    let launcher = ScriptedLauncher::new()
        .pause(Duration::from_millis(10))
        .output("x\n");
    let registry = Registry::new(launcher, fast_settings());
    let id = registry.start(job("jobs/x")).unwrap();

    let old = RecordingListener::new();
    let new = RecordingListener::new();
    registry.subscribe(&id, "s", old.listener()).unwrap();
    registry.subscribe(&id, "s", new.listener()).unwrap();

    let run = registry.get(&id).unwrap();
    assert_eq!(run.subscriber_count(), 1);
    with_timeout(run.wait()).await;

    assert!(old.deliveries().is_empty());
    assert_eq!(new.text(), "x<br>");
    assert_eq!(new.terminal_count(), 1);
}

#[tokio::test]
async fn split_multibyte_characters_are_not_mangled() {
    let launcher = ScriptedLauncher::new()
        .bytes(&[b'h', 0xC3])
        .bytes(&[0xA9, b'\n']);
    let registry = Registry::new(launcher, fast_settings());
    let id = registry.start(job("jobs/utf8")).unwrap();

    let run = registry.get(&id).unwrap();
    with_timeout(run.wait()).await;
    assert_eq!(run.logs(), "hé<br>");
}

#[tokio::test]
async fn unknown_run_ids_are_reported() {
    let registry = Registry::new(ScriptedLauncher::new(), fast_settings());

    assert!(registry.get("nope").is_none());
    assert!(matches!(registry.cancel("nope"), Err(WebcliError::RunNotFound(id)) if id == "nope"));
    assert!(matches!(registry.logs("nope"), Err(WebcliError::RunNotFound(_))));
    assert!(matches!(registry.unsubscribe("nope", "s"), Err(WebcliError::RunNotFound(_))));
    assert!(matches!(
        registry.subscribe("nope", "s", RecordingListener::new().listener()),
        Err(WebcliError::RunNotFound(_))
    ));
    assert!(matches!(registry.stream("nope"), Err(WebcliError::RunNotFound(_))));
}

#[tokio::test]
async fn list_returns_summaries_oldest_first() {
    let registry = Registry::new(ScriptedLauncher::new().hang(), fast_settings());
    let first = registry
        .start(vec!["jobs/tick".to_string(), "--count=1".to_string()])
        .unwrap();
    let second = registry.start(job("jobs/echo")).unwrap();

    let list = registry.list();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, first);
    assert_eq!(list[0].command, "jobs/tick");
    assert_eq!(list[0].args, vec!["--count=1"]);
    assert_eq!(list[1].id, second);
    assert!(list.iter().all(|s| s.status == RunStatus::Running));

    with_timeout(registry.shutdown(Duration::from_secs(1))).await;
}

#[tokio::test]
async fn panicking_listener_does_not_wedge_the_run() {
    init_tracing();
    let launcher = ScriptedLauncher::new().output("boom\n").output("more\n");
    let registry = Registry::new(launcher, fast_settings());
    let id = registry.start(job("jobs/boom")).unwrap();

    let healthy = RecordingListener::new();
    registry
        .subscribe(&id, "faulty", |chunk: &str, _terminal: bool| {
            if chunk.contains("boom") {
                panic!("listener bug");
            }
        })
        .unwrap();
    registry.subscribe(&id, "healthy", healthy.listener()).unwrap();

    let run = registry.get(&id).unwrap();
    assert_eq!(with_timeout(run.wait()).await, RunStatus::Completed);
    assert_eq!(run.logs(), "boom<br>more<br>");
    assert_eq!(healthy.text(), "boom<br>more<br>");
    assert_eq!(healthy.terminal_count(), 1);
    assert_eq!(run.subscriber_count(), 0);
}

#[tokio::test]
async fn crlf_split_across_reads_is_one_line_break() {
    let launcher = ScriptedLauncher::new().output("a\r").output("\nb");
    let registry = Registry::new(launcher, fast_settings());
    let id = registry.start(job("jobs/crlf")).unwrap();
    let rec = RecordingListener::new();
    registry.subscribe(&id, "s1", rec.listener()).unwrap();

    let run = registry.get(&id).unwrap();
    with_timeout(run.wait()).await;

    assert_eq!(run.logs(), "a<br>b");
    assert_eq!(rec.text(), "a<br>b");
}

#[tokio::test]
async fn verbatim_formatter_keeps_raw_line_breaks() {
    let settings = RunSettings {
        formatter: Arc::new(Verbatim),
        ..fast_settings()
    };
    let launcher = ScriptedLauncher::new().output("a\r").output("\nb\n");
    let registry = Registry::new(launcher, settings);
    let id = registry.start(job("jobs/raw")).unwrap();

    let run = registry.get(&id).unwrap();
    with_timeout(run.wait()).await;
    assert_eq!(run.logs(), "a\r\nb\n");
}
