use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;

use super::*;

struct LeafTree {
	label: String,
	span: Span,
}

impl SubtreeHandle for LeafTree {
	fn label(&self) -> String {
		self.label.clone()
	}

	fn category(&self) -> &str {
		"mock"
	}

	fn style(&self) -> StyleHint {
		StyleHint::default()
	}

	fn span(&self) -> Span {
		self.span
	}

	fn child_count(&self) -> usize {
		0
	}

	fn materialize_children(&self) -> Vec<Arc<dyn SubtreeHandle>> {
		Vec::new()
	}
}

fn leaf_for(source: &str) -> Arc<dyn SubtreeHandle> {
	Arc::new(LeafTree {
		label: source.to_string(),
		span: Span::new(0, source.len()),
	})
}

/// Backend that completes immediately, recording every analyzed text.
#[derive(Default)]
struct RecordingBackend {
	analyzed: Mutex<Vec<String>>,
}

impl AnalysisBackend for RecordingBackend {
	fn analyze(
		&self,
		source: &str,
		_options: &AnalysisOptions,
		_token: &AnalysisToken,
	) -> Result<Arc<dyn SubtreeHandle>, AnalysisError> {
		self.analyzed.lock().push(source.to_string());
		Ok(leaf_for(source))
	}
}

/// Backend that blocks inside `analyze` until the test calls `proceed`,
/// then checks its token, the cooperative-checkpoint shape real backends
/// have between stages.
struct GatedBackend {
	entered: AtomicUsize,
	gate: Mutex<std::sync::mpsc::Receiver<()>>,
	release: std::sync::mpsc::Sender<()>,
}

impl GatedBackend {
	fn new() -> Self {
		let (release, gate) = std::sync::mpsc::channel();
		Self {
			entered: AtomicUsize::new(0),
			gate: Mutex::new(gate),
			release,
		}
	}

	fn proceed(&self) {
		self.release.send(()).ok();
	}

	async fn wait_entered(&self, count: usize) {
		let mut iters = 0;
		while self.entered.load(Ordering::SeqCst) < count && iters < 1000 {
			sleep(Duration::from_millis(1)).await;
			iters += 1;
		}
		assert!(self.entered.load(Ordering::SeqCst) >= count);
	}
}

impl AnalysisBackend for GatedBackend {
	fn analyze(
		&self,
		source: &str,
		_options: &AnalysisOptions,
		token: &AnalysisToken,
	) -> Result<Arc<dyn SubtreeHandle>, AnalysisError> {
		self.entered.fetch_add(1, Ordering::SeqCst);
		self.gate.lock().recv().ok();
		if token.is_cancelled() {
			return Err(AnalysisError::Cancelled);
		}
		Ok(leaf_for(source))
	}
}

struct FailingBackend;

impl AnalysisBackend for FailingBackend {
	fn analyze(
		&self,
		_source: &str,
		_options: &AnalysisOptions,
		_token: &AnalysisToken,
	) -> Result<Arc<dyn SubtreeHandle>, AnalysisError> {
		Err(AnalysisError::Backend("unparsable".to_string()))
	}
}

fn pipeline_over(
	backend: Arc<dyn AnalysisBackend>,
	quiet: Duration,
) -> (
	Arc<AnalysisExecutor>,
	TriggerCoordinator,
	tokio::sync::mpsc::UnboundedReceiver<AnalysisEvent>,
) {
	let (executor, events) = AnalysisExecutor::new(backend);
	let executor = Arc::new(executor);
	let trigger = TriggerCoordinator::new(Arc::clone(&executor), quiet);
	(executor, trigger, events)
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_to_last_text() {
	let backend = Arc::new(RecordingBackend::default());
	let (_executor, trigger, mut events) =
		pipeline_over(backend.clone(), Duration::from_millis(500));

	// Changes at t=0, 100, 200, 600, each inside the previous quiet window.
	trigger.on_text_changed("a".into());
	sleep(Duration::from_millis(100)).await;
	trigger.on_text_changed("ab".into());
	sleep(Duration::from_millis(100)).await;
	trigger.on_text_changed("abc".into());
	sleep(Duration::from_millis(400)).await;
	trigger.on_text_changed("abcd".into());

	let event = events.recv().await.unwrap();
	assert!(matches!(event.outcome, AnalysisOutcome::Completed(_)));
	assert_eq!(*backend.analyzed.lock(), vec!["abcd".to_string()]);
	assert!(events.try_recv().is_err(), "burst must yield one submission");
}

#[tokio::test(start_paused = true)]
async fn test_change_after_quiet_period_submits_again() {
	let backend = Arc::new(RecordingBackend::default());
	let (_executor, trigger, mut events) =
		pipeline_over(backend.clone(), Duration::from_millis(50));

	trigger.on_text_changed("one".into());
	assert!(matches!(
		events.recv().await.unwrap().outcome,
		AnalysisOutcome::Completed(_)
	));

	// Identical text is allowed to resubmit; no content short-circuit.
	trigger.on_text_changed("one".into());
	events.recv().await.unwrap();
	assert_eq!(backend.analyzed.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_ignore_delay_once_bypasses_debounce() {
	let backend = Arc::new(RecordingBackend::default());
	let (_executor, trigger, mut events) =
		pipeline_over(backend.clone(), Duration::from_millis(500));

	trigger.ignore_delay_once();
	trigger.on_text_changed("pasted".into());

	// No timer involved: the event arrives without advancing the clock.
	let event = events.recv().await.unwrap();
	assert!(matches!(event.outcome, AnalysisOutcome::Completed(_)));
	assert_eq!(*backend.analyzed.lock(), vec!["pasted".to_string()]);

	// The flag is one-shot; the next change debounces normally.
	trigger.on_text_changed("typed".into());
	assert!(trigger.has_pending_trigger());
	assert!(events.try_recv().is_err());
	sleep(Duration::from_millis(600)).await;
	events.recv().await.unwrap();
	assert_eq!(backend.analyzed.lock().last().unwrap(), "typed");
}

#[tokio::test(start_paused = true)]
async fn test_force_reanalysis_resubmits_last_text() {
	let backend = Arc::new(RecordingBackend::default());
	let (_executor, trigger, mut events) =
		pipeline_over(backend.clone(), Duration::from_millis(200));

	assert!(!trigger.force_reanalysis(), "nothing seen yet");

	trigger.on_text_changed("source".into());
	sleep(Duration::from_millis(250)).await;
	events.recv().await.unwrap();

	trigger.set_options(AnalysisOptions {
		show_root: false,
		..AnalysisOptions::default()
	});
	assert!(trigger.force_reanalysis());
	events.recv().await.unwrap();
	assert_eq!(
		*backend.analyzed.lock(),
		vec!["source".to_string(), "source".to_string()]
	);
}

#[tokio::test(start_paused = true)]
async fn test_quiet_period_is_reconfigurable() {
	let backend = Arc::new(RecordingBackend::default());
	let (_executor, trigger, mut events) =
		pipeline_over(backend.clone(), Duration::from_millis(500));

	trigger.set_quiet_period(Duration::from_millis(50));
	assert_eq!(trigger.quiet_period(), Duration::from_millis(50));

	trigger.on_text_changed("quick".into());
	sleep(Duration::from_millis(60)).await;
	events.recv().await.unwrap();
	assert_eq!(backend.analyzed.lock().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_submission_cancels_inflight() {
	let backend = Arc::new(GatedBackend::new());
	let (executor, mut events) = AnalysisExecutor::new(backend.clone());

	let first = executor.submit("r1".into(), AnalysisOptions::default());
	backend.wait_entered(1).await;

	// R2 supersedes R1 while R1 is still inside the backend.
	let second = executor.submit("r2".into(), AnalysisOptions::default());
	assert!(second > first);
	assert_eq!(executor.current_generation(), second);

	backend.proceed();
	backend.proceed();

	let event = events.recv().await.unwrap();
	assert_eq!(event.generation, first);
	assert!(matches!(event.outcome, AnalysisOutcome::Cancelled));

	let event = events.recv().await.unwrap();
	assert_eq!(event.generation, second);
	assert!(matches!(event.outcome, AnalysisOutcome::Completed(_)));

	// R1's terminal event is stale by the freshness rule appliers use.
	assert!(first < executor.current_generation());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_current_produces_cancellation_notice() {
	let backend = Arc::new(GatedBackend::new());
	let (executor, mut events) = AnalysisExecutor::new(backend.clone());

	executor.submit("doomed".into(), AnalysisOptions::default());
	backend.wait_entered(1).await;
	assert!(executor.has_inflight());

	executor.cancel_current();
	backend.proceed();

	let event = events.recv().await.unwrap();
	assert!(matches!(event.outcome, AnalysisOutcome::Cancelled));
}

#[tokio::test]
async fn test_backend_failure_is_an_event_not_a_panic() {
	let (executor, mut events) = AnalysisExecutor::new(Arc::new(FailingBackend));

	let generation = executor.submit("???".into(), AnalysisOptions::default());

	let event = events.recv().await.unwrap();
	assert_eq!(event.generation, generation);
	match event.outcome {
		AnalysisOutcome::Failed(diagnostic) => assert_eq!(diagnostic, "unparsable"),
		other => panic!("expected failure, got {other:?}"),
	}
}

#[tokio::test]
async fn test_options_are_captured_at_submission() {
	#[derive(Default)]
	struct OptionsProbe {
		seen: Mutex<Vec<AnalysisOptions>>,
	}

	impl AnalysisBackend for OptionsProbe {
		fn analyze(
			&self,
			source: &str,
			options: &AnalysisOptions,
			_token: &AnalysisToken,
		) -> Result<Arc<dyn SubtreeHandle>, AnalysisError> {
			self.seen.lock().push(options.clone());
			Ok(leaf_for(source))
		}
	}

	let backend = Arc::new(OptionsProbe::default());
	let (executor, mut events) = AnalysisExecutor::new(backend.clone());

	let custom = AnalysisOptions {
		show_root: false,
		label_limit: 7,
	};
	executor.submit("text".into(), custom.clone());
	events.recv().await.unwrap();
	assert_eq!(*backend.seen.lock(), vec![custom]);
}
