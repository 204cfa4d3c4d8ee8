//! The loop kernel.
//!
//! [`Governor`] is two things wearing one hat:
//!
//! - a [`layer0::Hook`], registered into whatever hook pipeline the
//!   wrapped [`layer0::Operator`] dispatches at every [`layer0::HookPoint`],
//!   where it tracks per-turn state and trips [`layer0::HookAction::Halt`]
//!   when a budget is exceeded, the model gets stuck, or a periodic judge
//!   passes an in-progress answer;
//! - an advisor that wraps the top-level call to `Operator::execute` via
//!   [`Governor::run`], turning the operator's [`layer0::ExitReason`]
//!   (plus whatever typed reason the hook side recorded) into a
//!   [`crate::result::TurnLimitedResult`].
//!
//! This mirrors how `neuron-op-react`'s ReAct driver consults its hook
//! registry at `ExitCheck` and converts `HookAction::Halt` into
//! `ExitReason::ObserverHalt` — the governor is that same tripwire,
//! factored out so any operator implementation can use it.
//!
//! The two hook points carry the composite termination policy's two
//! halves: [`HookPoint::PostInference`] fires immediately after a model
//! response is produced and evaluates the *post-call* conditions (stuck
//! detection, then periodic judging); [`HookPoint::ExitCheck`] fires once
//! the operator has finished any tool execution for that turn and
//! evaluates the *pre-call* conditions gating the next model round
//! (external abort, timeout, cost, max turns) — in that precedence order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use async_trait::async_trait;
use layer0::{
    Content, ExitReason, Hook, HookAction, HookContext, HookError, HookPoint, Operator,
    OperatorInput,
};

use crate::config::LoopConfig;
use crate::error::GovernorError;
use crate::events::{dispatch_listener, dispatch_observer, LoopListener, ToolObserver};
use crate::judge::{AggregatedVerdict, Judge, JudgeError, Verdict};
use crate::reason::TerminationReason;
use crate::result::TurnLimitedResult;
use crate::state::{output_signature, LoopState, RunId};

/// A cloneable handle that can abort a [`Governor`]'s in-flight run from
/// any thread, including one other than the run's own.
///
/// Open question resolved here: the abort flag is governor-wide rather
/// than keyed to a single [`RunId`]. A `Governor` drives at most one run
/// per calling thread at a time (see [`GovernorError::ReentrantRun`]), so
/// in practice a governor used for one concurrent run per thread never
/// confuses one run's abort for another's; a governor intentionally
/// shared to abort *all* of its threads' runs at once gets that for free.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Request that every run in progress on this governor stop at its
    /// next exit check.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-thread bookkeeping for one in-flight run. Kept out of `LoopState`
/// itself because the triggering task and judge verdict aren't part of
/// the pure state model — they're governor-side context needed to call
/// the judge and to attribute a reason to the final result.
struct RunEntry {
    state: LoopState,
    task: Content,
    last_verdict: Option<Verdict>,
}

/// Bounds one operator's model-tool cycles and reports why it stopped.
pub struct Governor {
    config: LoopConfig,
    judge: Option<Arc<dyn Judge>>,
    listeners: Vec<Arc<dyn LoopListener>>,
    tool_observers: Vec<Arc<dyn ToolObserver>>,
    runs: Mutex<HashMap<ThreadId, RunEntry>>,
    pending_reason: Mutex<HashMap<ThreadId, TerminationReason>>,
    pending_judge_error: Mutex<HashMap<ThreadId, JudgeError>>,
    abort_flag: Arc<AtomicBool>,
}

impl Governor {
    /// Start building a governor over `config`.
    #[must_use]
    pub fn builder(config: LoopConfig) -> GovernorBuilder {
        GovernorBuilder {
            config,
            judge: None,
            listeners: Vec::new(),
            tool_observers: Vec::new(),
        }
    }

    /// The immutable configuration this governor enforces.
    #[must_use]
    pub fn configuration(&self) -> &LoopConfig {
        &self.config
    }

    /// A handle that can abort any run in progress on this governor.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.abort_flag.clone())
    }

    /// Whether an abort has been requested for this governor.
    #[must_use]
    pub fn is_abort_signalled(&self) -> bool {
        self.abort_flag.load(Ordering::Relaxed)
    }

    /// A read-only snapshot of the calling thread's active run, if any.
    #[must_use]
    pub fn current_state(&self) -> Option<LoopState> {
        let thread_id = std::thread::current().id();
        self.runs
            .lock()
            .expect("governor run map poisoned")
            .get(&thread_id)
            .map(|entry| entry.state.clone())
    }

    /// Drive `operator` to completion under this governor's budgets.
    ///
    /// `operator` should have this governor registered as one of its
    /// hooks (typically via a [`neuron_hooks::HookRegistry`]) so that the
    /// [`Hook`] half of the governor sees each turn as it happens; this
    /// method alone only brackets the call, it does not itself drive
    /// individual turns.
    pub async fn run(
        &self,
        operator: &dyn Operator,
        input: OperatorInput,
    ) -> Result<TurnLimitedResult, GovernorError> {
        let thread_id = std::thread::current().id();
        let run_id = RunId::new();
        let initial_state = LoopState::initial(run_id.clone());

        {
            let mut runs = self.runs.lock().expect("governor run map poisoned");
            if runs.contains_key(&thread_id) {
                return Err(GovernorError::ReentrantRun);
            }
            runs.insert(
                thread_id,
                RunEntry {
                    state: initial_state.clone(),
                    task: input.message.clone(),
                    last_verdict: None,
                },
            );
        }

        for listener in &self.listeners {
            dispatch_listener(listener.as_ref(), |l| {
                l.on_loop_started(&initial_state, &input.message)
            });
        }

        let outcome = operator.execute(input.clone()).await;

        let entry = {
            let mut runs = self.runs.lock().expect("governor run map poisoned");
            runs.remove(&thread_id).unwrap_or_else(|| RunEntry {
                state: LoopState::initial(run_id.clone()),
                task: input.message.clone(),
                last_verdict: None,
            })
        };
        let typed_reason = self
            .pending_reason
            .lock()
            .expect("governor reason map poisoned")
            .remove(&thread_id);
        let judge_error = self
            .pending_judge_error
            .lock()
            .expect("governor judge-error map poisoned")
            .remove(&thread_id);

        if let Some(judge_error) = judge_error {
            for listener in &self.listeners {
                dispatch_listener(listener.as_ref(), |l| {
                    l.on_loop_failed(&entry.state, &judge_error.to_string())
                });
            }
            return Err(GovernorError::Judge(judge_error));
        }

        let output = match outcome {
            Ok(output) => output,
            Err(err) => {
                for listener in &self.listeners {
                    dispatch_listener(listener.as_ref(), |l| {
                        l.on_loop_failed(&entry.state, &err.to_string())
                    });
                }
                return Err(GovernorError::Operator(err));
            }
        };

        let reason = self.resolve_reason(&output.exit_reason, typed_reason);

        for listener in &self.listeners {
            if matches!(reason, TerminationReason::Error { .. }) {
                dispatch_listener(listener.as_ref(), |l| {
                    l.on_loop_failed(&entry.state, &error_message(&reason))
                });
            } else {
                dispatch_listener(listener.as_ref(), |l| {
                    l.on_loop_completed(&entry.state, &reason)
                });
            }
        }

        Ok(TurnLimitedResult::new(
            run_id,
            reason,
            output.metadata.turns_used,
            output.metadata.tokens_in + output.metadata.tokens_out,
            output.metadata.cost,
            output.metadata.duration.into(),
            entry.state,
            entry.last_verdict,
            Some(output.message),
        ))
    }

    fn resolve_reason(
        &self,
        exit_reason: &ExitReason,
        typed_reason: Option<TerminationReason>,
    ) -> TerminationReason {
        match exit_reason {
            ExitReason::Complete => TerminationReason::NaturalCompletion,
            ExitReason::MaxTurns => TerminationReason::MaxTurnsReached,
            ExitReason::Timeout => TerminationReason::TimedOut,
            ExitReason::BudgetExhausted => TerminationReason::CostBudgetExhausted,
            ExitReason::ObserverHalt { reason } => {
                typed_reason.unwrap_or(TerminationReason::Error {
                    message: reason.clone(),
                })
            }
            ExitReason::CircuitBreaker => TerminationReason::Error {
                message: "circuit breaker tripped".to_string(),
            },
            ExitReason::Error => TerminationReason::Error {
                message: "operator reported an unrecoverable error".to_string(),
            },
            ExitReason::Custom(label) if label == "state_terminal" => {
                TerminationReason::StateTerminal
            }
            ExitReason::Custom(label) => TerminationReason::Error {
                message: format!("unrecognized exit reason: {label}"),
            },
            // `ExitReason` is `#[non_exhaustive]`; a future variant falls
            // back to a generic failure rather than failing to compile.
            _ => TerminationReason::Error {
                message: "unrecognized exit reason".to_string(),
            },
        }
    }

    /// `PostInference`: fold the turn into state, then run the post-call
    /// checks (stuck, then periodic judge) in that order. Returns the
    /// reason if either tripped.
    async fn record_turn(&self, thread_id: ThreadId, ctx: &HookContext) -> Option<TerminationReason> {
        let (next_state, task, answer) = {
            let runs = self.runs.lock().expect("governor run map poisoned");
            let entry = runs.get(&thread_id)?;
            let had_tool_calls = matches!(
                &ctx.model_output,
                Some(Content::Blocks(blocks))
                    if blocks.iter().any(|b| matches!(b, layer0::ContentBlock::ToolUse { .. }))
            );
            let signature = ctx
                .model_output
                .as_ref()
                .and_then(Content::as_text)
                .map(output_signature)
                .unwrap_or_else(|| output_signature(""));
            let tokens_this_turn = ctx.tokens_used.saturating_sub(entry.state.total_tokens_used());
            let cost_this_turn = ctx.cost - entry.state.estimated_cost();
            let next = entry.state.complete_turn(
                tokens_this_turn,
                cost_this_turn.max(rust_decimal::Decimal::ZERO),
                had_tool_calls,
                signature,
            );
            (
                next,
                entry.task.clone(),
                ctx.model_output.clone().unwrap_or(Content::text("")),
            )
        };

        let reason = if self
            .config
            .stuck_after()
            .is_some_and(|threshold| next_state.is_stuck(threshold))
        {
            Some(TerminationReason::Stuck)
        } else {
            None
        };

        let (reason, verdict) = if reason.is_none() {
            match self.maybe_judge(&next_state, &task, &answer).await {
                Ok(outcome) => outcome,
                Err(judge_error) => {
                    self.pending_judge_error
                        .lock()
                        .expect("governor judge-error map poisoned")
                        .insert(thread_id, judge_error);
                    (Some(TerminationReason::Error {
                        message: "judge failed".to_string(),
                    }), None)
                }
            }
        } else {
            (reason, None)
        };

        let snapshot = next_state
            .turn_history()
            .last()
            .expect("complete_turn always appends one snapshot")
            .clone();
        for listener in &self.listeners {
            dispatch_listener(listener.as_ref(), |l| {
                l.on_turn_completed(&next_state, &snapshot, reason.as_ref())
            });
        }

        if let Some(reason) = &reason {
            self.pending_reason
                .lock()
                .expect("governor reason map poisoned")
                .insert(thread_id, reason.clone());
        }

        let mut runs = self.runs.lock().expect("governor run map poisoned");
        if let Some(entry) = runs.get_mut(&thread_id) {
            entry.state = next_state;
            if verdict.is_some() {
                entry.last_verdict = verdict;
            }
        }

        reason
    }

    async fn maybe_judge(
        &self,
        state: &LoopState,
        task: &Content,
        answer: &Content,
    ) -> Result<(Option<TerminationReason>, Option<Verdict>), JudgeError> {
        let Some(judge) = &self.judge else {
            return Ok((None, None));
        };
        let interval = self.config.judge_evaluation_interval();
        if interval == 0 || state.current_turn() % interval != 0 {
            return Ok((None, None));
        }
        let verdict = judge
            .evaluate(state, task, answer, self.config.working_directory())
            .await?;
        let aggregated = AggregatedVerdict::new(vec![verdict.clone()]);
        let reason = aggregated
            .meets_threshold(self.config.score_threshold())
            .then_some(TerminationReason::ScoreThresholdMet);
        Ok((reason, Some(verdict)))
    }

    /// `ExitCheck`: the pre-call checks gating the next model round, in
    /// precedence order (external abort, timeout, cost, max turns).
    fn check_exit(&self, thread_id: ThreadId) -> HookAction {
        let runs = self.runs.lock().expect("governor run map poisoned");
        let Some(entry) = runs.get(&thread_id) else {
            return HookAction::Continue;
        };
        let state = &entry.state;

        let reason = if self.abort_flag.load(Ordering::Relaxed) {
            Some(TerminationReason::Aborted)
        } else if self
            .config
            .timeout()
            .is_some_and(|t| state.timeout_exceeded(t))
        {
            Some(TerminationReason::TimedOut)
        } else if self
            .config
            .max_cost()
            .is_some_and(|limit| state.cost_exceeded(limit))
        {
            Some(TerminationReason::CostBudgetExhausted)
        } else if state.max_turns_reached(self.config.max_turns()) {
            Some(TerminationReason::MaxTurnsReached)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                let message = exit_message(&reason);
                self.pending_reason
                    .lock()
                    .expect("governor reason map poisoned")
                    .insert(thread_id, reason);
                HookAction::Halt { reason: message }
            }
            None => HookAction::Continue,
        }
    }

    fn note_turn_started(&self, thread_id: ThreadId) {
        let runs = self.runs.lock().expect("governor run map poisoned");
        let Some(entry) = runs.get(&thread_id) else {
            return;
        };
        let turn_index = entry.state.current_turn();
        for listener in &self.listeners {
            dispatch_listener(listener.as_ref(), |l| {
                l.on_turn_started(&entry.state, turn_index)
            });
        }
    }
}

fn exit_message(reason: &TerminationReason) -> String {
    match reason {
        TerminationReason::Aborted => "externally aborted".to_string(),
        TerminationReason::MaxTurnsReached => "max turns reached".to_string(),
        TerminationReason::TimedOut => "timeout exceeded".to_string(),
        TerminationReason::CostBudgetExhausted => "cost budget exhausted".to_string(),
        TerminationReason::Stuck => "stuck: repeated output detected".to_string(),
        TerminationReason::ScoreThresholdMet => "judge score threshold met".to_string(),
        TerminationReason::NaturalCompletion
        | TerminationReason::StateTerminal
        | TerminationReason::Error { .. } => "halted".to_string(),
    }
}

fn error_message(reason: &TerminationReason) -> String {
    match reason {
        TerminationReason::Error { message } => message.clone(),
        _ => "unknown error".to_string(),
    }
}

#[async_trait]
impl Hook for Governor {
    fn points(&self) -> &[HookPoint] {
        &[
            HookPoint::PreInference,
            HookPoint::PostInference,
            HookPoint::ExitCheck,
            HookPoint::PreToolUse,
            HookPoint::PostToolUse,
        ]
    }

    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError> {
        let thread_id = std::thread::current().id();
        match ctx.point {
            HookPoint::PreInference => {
                self.note_turn_started(thread_id);
                Ok(HookAction::Continue)
            }
            HookPoint::PostInference => match self.record_turn(thread_id, ctx).await {
                Some(reason) => Ok(HookAction::Halt {
                    reason: exit_message(&reason),
                }),
                None => Ok(HookAction::Continue),
            },
            HookPoint::ExitCheck => Ok(self.check_exit(thread_id)),
            HookPoint::PreToolUse => {
                if let Some(name) = &ctx.tool_name {
                    let input = ctx.tool_input.clone().unwrap_or(serde_json::Value::Null);
                    for observer in &self.tool_observers {
                        dispatch_observer(observer.as_ref(), |o| {
                            o.on_tool_call_start(name, &input)
                        });
                    }
                }
                Ok(HookAction::Continue)
            }
            HookPoint::PostToolUse => {
                if let (Some(name), Some(result)) = (&ctx.tool_name, &ctx.tool_result) {
                    let output = serde_json::Value::String(result.clone());
                    for observer in &self.tool_observers {
                        dispatch_observer(observer.as_ref(), |o| {
                            o.on_tool_call_complete(name, &output)
                        });
                    }
                }
                Ok(HookAction::Continue)
            }
            // `HookPoint` is `#[non_exhaustive]`; a future point is a no-op
            // until the governor is taught what to do with it.
            _ => Ok(HookAction::Continue),
        }
    }
}

/// Builder for [`Governor`].
pub struct GovernorBuilder {
    config: LoopConfig,
    judge: Option<Arc<dyn Judge>>,
    listeners: Vec<Arc<dyn LoopListener>>,
    tool_observers: Vec<Arc<dyn ToolObserver>>,
}

impl GovernorBuilder {
    /// Consult `judge` periodically, per
    /// [`LoopConfig::judge_evaluation_interval`].
    #[must_use]
    pub fn judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Register a listener for turn and termination events.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn LoopListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Register an observer for tool-call traffic.
    #[must_use]
    pub fn tool_observer(mut self, observer: Arc<dyn ToolObserver>) -> Self {
        self.tool_observers.push(observer);
        self
    }

    /// Finish building the governor.
    #[must_use]
    pub fn build(self) -> Governor {
        Governor {
            config: self.config,
            judge: self.judge,
            listeners: self.listeners,
            tool_observers: self.tool_observers,
            runs: Mutex::new(HashMap::new()),
            pending_reason: Mutex::new(HashMap::new()),
            pending_judge_error: Mutex::new(HashMap::new()),
            abort_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

