//! Operator CLI for the interactive customization governance pipeline
//! (SPEC_FULL §3): `run` drives one session through the full pipeline;
//! `approval`/`adapter` act on an existing session's artifacts; `feedback`
//! records user feedback; `report` aggregates signals/feedback across
//! sessions into a governance report.

#![deny(unsafe_code)]

use adapter::{ApplyOptions, ErpClient, SimulatedErpClient};
use approval::{Actor, ApprovalState};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use context_bridge::Dialect;
use event_log::JsonlStream;
use gov_core::{
    ids, DialogueProfile, ExecutionMode, FeedbackChannel, GovError, RuntimeEnvironment, RuntimeMode, UiMode,
};
use orchestrator::{RunConfig, SessionPaths};
use policy_engine::Policy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use signals::{
    filter_feedback, filter_signals, generate, ExecutionCounts, FeedbackRecord, ReportInputs, Signal, SignalStage,
    Window,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "gov", about = "Interactive customization governance pipeline")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive one session through the full governance pipeline (C2-C11).
    Run(RunArgs),
    /// Act on an existing session's approval workflow (C9).
    Approval {
        #[command(subcommand)]
        action: ApprovalAction,
    },
    /// Act on an existing session's adapter/execution ledger (C10).
    Adapter {
        #[command(subcommand)]
        action: AdapterAction,
    },
    /// Record a user feedback record (SPEC_FULL §4).
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },
    /// Aggregate signals/feedback across sessions into a governance report
    /// (C13, §4.13).
    Report(ReportArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Session identifier; also the artifact subdirectory name.
    #[arg(long)]
    session: String,
    /// Root directory under which `<session>/` is created.
    #[arg(long, default_value = "./gov-out")]
    out_dir: PathBuf,
    /// Path to a JSON policy file; omit for the built-in default.
    #[arg(long)]
    policy: Option<PathBuf>,
    /// Path to a raw, provider-shaped page-context JSON payload. When
    /// omitted, a minimal context is built from `--product`/`--module`/
    /// `--page`/`--entity`.
    #[arg(long)]
    context: Option<PathBuf>,
    /// Provider dialect the raw context is shaped in.
    #[arg(long, default_value = "generic", value_parser = Dialect::parse_arg)]
    dialect: Dialect,
    /// Reject the run outright on a context-contract violation.
    #[arg(long)]
    strict_contract: bool,
    /// The business goal driving this change.
    #[arg(long)]
    goal: String,
    /// The user proposing this change.
    #[arg(long, default_value = "cli-user")]
    user: String,
    /// Product namespace, used only when `--context` is omitted.
    #[arg(long, default_value = "moqui")]
    product: String,
    /// Module, used only when `--context` is omitted.
    #[arg(long, default_value = "general")]
    module: String,
    /// Page, used only when `--context` is omitted.
    #[arg(long, default_value = "default")]
    page: String,
    /// Entity, used only when `--context` is omitted.
    #[arg(long)]
    entity: Option<String>,
    /// Dialogue profile to resolve.
    #[arg(long, default_value = "business-user", value_parser = parse_dialogue_profile)]
    profile: DialogueProfile,
    /// Active runtime mode.
    #[arg(long, default_value = "user-assist", value_parser = parse_runtime_mode)]
    runtime_mode: RuntimeMode,
    /// Active runtime environment.
    #[arg(long, default_value = "dev", value_parser = parse_runtime_environment)]
    runtime_environment: RuntimeEnvironment,
    /// Active UI surface, if any.
    #[arg(long, value_parser = parse_ui_mode)]
    ui_mode: Option<UiMode>,
    /// Requested execution mode.
    #[arg(long, default_value = "apply", value_parser = parse_execution_mode)]
    execution_mode: ExecutionMode,
    /// Auto-submit-and-approve when the plan is low-risk.
    #[arg(long)]
    auto_approve_low_risk: bool,
    /// Auto-execute once auto-approved (subject to runtime/tier gates).
    #[arg(long)]
    auto_execute_low_risk: bool,
    /// Actually invoke the live adapter rather than simulate.
    #[arg(long)]
    live_apply: bool,
    /// Plaintext password for the approval execute guard, if any.
    #[arg(long)]
    auth_password: Option<String>,
    /// Map a dialogue deny to exit code 2.
    #[arg(long)]
    fail_on_dialogue_deny: bool,
    /// Print the run summary as JSON to stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum ApprovalAction {
    /// Submit a draft plan for review.
    Submit(ActorArgs),
    /// Resubmit a rejected plan.
    Resubmit(ActorArgs),
    /// Approve a submitted plan.
    Approve(ActorArgs),
    /// Reject a submitted plan.
    Reject(ActorArgs),
    /// Execute an approved plan, subject to its guards.
    Execute {
        #[command(flatten)]
        actor: ActorArgs,
        /// Plaintext password for the execute guard, if required.
        #[arg(long)]
        password: Option<String>,
        /// Require the executing actor to differ from the approving actor.
        #[arg(long)]
        require_distinct_actor_roles: bool,
    },
    /// Verify an executed plan.
    Verify(ActorArgs),
    /// Archive a verified (or rejected) plan.
    Archive(ActorArgs),
    /// Print the full audit trail for a session's approval workflow.
    History {
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(Parser, Debug)]
struct ActorArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Acting actor id.
    #[arg(long)]
    actor: String,
    /// Acting actor's role, if any.
    #[arg(long)]
    actor_role: Option<String>,
    /// Optional free-text comment.
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Parser, Debug)]
struct SessionArgs {
    /// Session identifier.
    #[arg(long)]
    session: String,
    /// Root directory the session lives under.
    #[arg(long, default_value = "./gov-out")]
    out_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum AdapterAction {
    /// Apply the session's change plan.
    Apply {
        #[command(flatten)]
        session: SessionArgs,
        /// Actually invoke the live adapter rather than simulate.
        #[arg(long)]
        live_apply: bool,
    },
    /// Apply the session's change plan, refusing anything above low risk.
    ApplyLowRisk {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        live_apply: bool,
    },
    /// Roll back a prior successful execution.
    Rollback {
        #[command(flatten)]
        session: SessionArgs,
        /// The execution id to roll back.
        #[arg(long)]
        execution_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum FeedbackAction {
    /// Append one feedback record.
    Record {
        #[command(flatten)]
        session: SessionArgs,
        /// Submitting user id.
        #[arg(long)]
        user: String,
        /// Score in `0..=5`.
        #[arg(long)]
        score: u8,
        /// Submission channel.
        #[arg(long, default_value = "cli", value_parser = parse_feedback_channel)]
        channel: FeedbackChannel,
        /// Optional free-text comment.
        #[arg(long)]
        comment: Option<String>,
        /// Free-form tags (repeatable).
        #[arg(long)]
        tag: Vec<String>,
    },
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Directory containing the global signal stream and per-session
    /// subdirectories.
    #[arg(long)]
    signals_dir: PathBuf,
    /// Reporting window; ignored when `--from`/`--to` are both given.
    #[arg(long, default_value = "all", value_parser = parse_window)]
    window: WindowArg,
    /// Custom window lower bound (RFC3339), paired with `--to`.
    #[arg(long)]
    from: Option<String>,
    /// Custom window upper bound (RFC3339), paired with `--from`.
    #[arg(long)]
    to: Option<String>,
    /// Exit 2 if the generated report contains any high-severity alert.
    #[arg(long)]
    fail_on_alert: bool,
}

#[derive(Debug, Clone, Copy)]
enum WindowArg {
    Weekly,
    Monthly,
    All,
}

fn parse_window(s: &str) -> Result<WindowArg, String> {
    match s.to_ascii_lowercase().as_str() {
        "weekly" => Ok(WindowArg::Weekly),
        "monthly" => Ok(WindowArg::Monthly),
        "all" => Ok(WindowArg::All),
        other => Err(format!("unknown window {other:?}, expected weekly|monthly|all")),
    }
}

trait DialectParseExt {
    fn parse_arg(s: &str) -> Result<Dialect, String>;
}

impl DialectParseExt for Dialect {
    fn parse_arg(s: &str) -> Result<Dialect, String> {
        Ok(Dialect::parse(s))
    }
}

fn parse_dialogue_profile(s: &str) -> Result<DialogueProfile, String> {
    match s {
        "business-user" => Ok(DialogueProfile::BusinessUser),
        "system-maintainer" => Ok(DialogueProfile::SystemMaintainer),
        other => Err(format!("unknown dialogue profile {other:?}, expected business-user|system-maintainer")),
    }
}

fn parse_runtime_mode(s: &str) -> Result<RuntimeMode, String> {
    match s {
        "user-assist" => Ok(RuntimeMode::UserAssist),
        "ops-fix" => Ok(RuntimeMode::OpsFix),
        "feature-dev" => Ok(RuntimeMode::FeatureDev),
        other => Err(format!("unknown runtime mode {other:?}, expected user-assist|ops-fix|feature-dev")),
    }
}

fn parse_runtime_environment(s: &str) -> Result<RuntimeEnvironment, String> {
    match s {
        "dev" => Ok(RuntimeEnvironment::Dev),
        "staging" => Ok(RuntimeEnvironment::Staging),
        "prod" => Ok(RuntimeEnvironment::Prod),
        other => Err(format!("unknown runtime environment {other:?}, expected dev|staging|prod")),
    }
}

fn parse_ui_mode(s: &str) -> Result<UiMode, String> {
    match s {
        "user-app" => Ok(UiMode::UserApp),
        "ops-console" => Ok(UiMode::OpsConsole),
        "dev-workbench" => Ok(UiMode::DevWorkbench),
        other => Err(format!("unknown ui mode {other:?}, expected user-app|ops-console|dev-workbench")),
    }
}

fn parse_execution_mode(s: &str) -> Result<ExecutionMode, String> {
    match s {
        "suggestion" => Ok(ExecutionMode::Suggestion),
        "apply" => Ok(ExecutionMode::Apply),
        other => Err(format!("unknown execution mode {other:?}, expected suggestion|apply")),
    }
}

fn parse_feedback_channel(s: &str) -> Result<FeedbackChannel, String> {
    match s {
        "ui" => Ok(FeedbackChannel::Ui),
        "cli" => Ok(FeedbackChannel::Cli),
        "api" => Ok(FeedbackChannel::Api),
        "other" => Ok(FeedbackChannel::Other),
        other => Err(format!("unknown feedback channel {other:?}, expected ui|cli|api|other")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_json_logging();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<i32, GovError> {
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Approval { action } => cmd_approval(action),
        Command::Adapter { action } => cmd_adapter(action),
        Command::Feedback { action } => cmd_feedback(action),
        Command::Report(args) => cmd_report(args),
    }
}

fn build_raw_context(args: &RunArgs) -> Result<Value, GovError> {
    if let Some(path) = &args.context {
        let text = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&text)?);
    }
    let mut ctx = serde_json::json!({
        "product": args.product,
        "module": args.module,
        "page": args.page,
        "current_state": "viewing",
        "fields": [],
    });
    if let Some(entity) = &args.entity {
        ctx["entity"] = Value::String(entity.clone());
    }
    Ok(ctx)
}

fn cmd_run(args: RunArgs) -> Result<i32, GovError> {
    let policy = Policy::load(args.policy.as_deref()).map_err(policy_err)?;
    let raw_context = build_raw_context(&args)?;
    let cfg = RunConfig {
        session_id: args.session,
        out_dir: args.out_dir,
        raw_context,
        dialect: args.dialect,
        strict_contract: args.strict_contract,
        user_id: args.user,
        goal: args.goal,
        dialogue_profile: args.profile,
        runtime_mode: args.runtime_mode,
        runtime_environment: args.runtime_environment,
        ui_mode: args.ui_mode,
        execution_mode: args.execution_mode,
        auto_approve_low_risk: args.auto_approve_low_risk,
        auto_execute_low_risk: args.auto_execute_low_risk,
        live_apply: args.live_apply,
        auth_password: args.auth_password,
        fail_on_dialogue_deny: args.fail_on_dialogue_deny,
    };
    let client: SimulatedErpClient = orchestrator::default_client();
    let summary = orchestrator::run(&cfg, &policy, &client)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "session={} dialogue={:?} gate={:?} runtime={:?} authorization={:?} approval={:?} execution={:?} work_order={:?}/{:?} exit={}",
            summary.session_id,
            summary.dialogue_decision,
            summary.gate_decision,
            summary.runtime_decision,
            summary.authorization_decision,
            summary.approval_status,
            summary.execution_result,
            summary.work_order_status,
            summary.work_order_priority,
            summary.exit_code,
        );
    }
    Ok(summary.exit_code)
}

fn policy_err(e: policy_engine::PolicyError) -> GovError {
    match e {
        policy_engine::PolicyError::Read { path, source } => GovError::Config(format!("{path}: {source}")),
        policy_engine::PolicyError::Parse { path, source } => GovError::Config(format!("{path}: {source}")),
        policy_engine::PolicyError::ProfileNotFound(name) => GovError::ProfileNotFound(name),
        policy_engine::PolicyError::ModeNotDefined(name) => GovError::ModeNotDefined(name),
        policy_engine::PolicyError::EnvironmentNotDefined(name) => GovError::EnvironmentNotDefined(name),
    }
}

fn approval_err(e: approval::ApprovalError) -> GovError {
    match e {
        approval::ApprovalError::AlreadyExists(plan_id) => {
            GovError::Config(format!("approval state already exists for plan {plan_id}"))
        }
        approval::ApprovalError::InvalidTransition { action, from } => {
            GovError::ApprovalBlocked(format!("cannot {action} from state {from}"))
        }
        approval::ApprovalError::InvalidHashShape(hash_env) => {
            GovError::Config(format!("password hash for {hash_env} is not a valid sha256 hex digest"))
        }
        approval::ApprovalError::EventLog(err) => event_log_err(err),
    }
}

fn event_log_err(e: event_log::EventLogError) -> GovError {
    match e {
        event_log::EventLogError::Io(err) => GovError::Io(err),
        event_log::EventLogError::Serde(err) => GovError::Serde(err),
    }
}

fn adapter_err(e: adapter::AdapterError) -> GovError {
    match e {
        adapter::AdapterError::Ledger(err) => event_log_err(err),
    }
}

fn require_json<T: DeserializeOwned>(path: &Path) -> Result<T, GovError> {
    let text = std::fs::read_to_string(path)
        .map_err(|_| GovError::Config(format!("missing required artifact {}", path.display())))?;
    Ok(serde_json::from_str(&text)?)
}

fn load_approval_state(paths: &SessionPaths) -> Result<ApprovalState, GovError> {
    require_json(&paths.approval_state())
}

fn write_approval_state(paths: &SessionPaths, state: &ApprovalState) -> Result<(), GovError> {
    let text = serde_json::to_string_pretty(state)?;
    std::fs::write(paths.approval_state(), text)?;
    Ok(())
}

fn cmd_approval(action: ApprovalAction) -> Result<i32, GovError> {
    match action {
        ApprovalAction::Submit(a) => approval_transition(a, approval::submit),
        ApprovalAction::Resubmit(a) => approval_transition(a, approval::resubmit),
        ApprovalAction::Approve(a) => approval_transition(a, approval::approve),
        ApprovalAction::Reject(a) => approval_transition(a, approval::reject),
        ApprovalAction::Verify(a) => approval_transition(a, approval::verify),
        ApprovalAction::Archive(a) => approval_transition(a, approval::archive),
        ApprovalAction::Execute { actor, password, require_distinct_actor_roles } => {
            let paths = SessionPaths::new(&actor.session.out_dir, &actor.session.session);
            let mut state = load_approval_state(&paths)?;
            let log = JsonlStream::open(paths.approval_events()).map_err(event_log_err)?;
            let who = Actor { id: actor.actor.clone(), role: actor.actor_role.clone() };
            let outcome = approval::execute(
                state.clone(),
                &log,
                ids::next_record_id(),
                ids::now_ms(),
                &ids::now_iso8601(),
                &who,
                password.as_deref(),
                None,
                require_distinct_actor_roles,
            )
            .map_err(approval_err)?;
            state = outcome.state;
            write_approval_state(&paths, &state)?;
            println!("status={} blocked={}", state.status, outcome.blocked);
            if outcome.blocked {
                return Err(GovError::ApprovalBlocked(
                    outcome.reason.unwrap_or_else(|| "execute blocked".to_string()),
                ));
            }
            Ok(0)
        }
        ApprovalAction::History { session } => {
            let paths = SessionPaths::new(&session.out_dir, &session.session);
            let state = load_approval_state(&paths)?;
            let log = JsonlStream::open(paths.approval_events()).map_err(event_log_err)?;
            let events = approval::history(&log, &state.workflow_id).map_err(approval_err)?;
            println!("{}", serde_json::to_string_pretty(&events)?);
            Ok(0)
        }
    }
}

#[allow(clippy::type_complexity)]
fn approval_transition(
    args: ActorArgs,
    transition: fn(
        &mut ApprovalState,
        &JsonlStream,
        u64,
        u64,
        &str,
        &Actor,
        Option<String>,
    ) -> Result<(), approval::ApprovalError>,
) -> Result<i32, GovError> {
    let paths = SessionPaths::new(&args.session.out_dir, &args.session.session);
    let mut state = load_approval_state(&paths)?;
    let log = JsonlStream::open(paths.approval_events()).map_err(event_log_err)?;
    let actor = Actor { id: args.actor, role: args.actor_role };
    transition(&mut state, &log, ids::next_record_id(), ids::now_ms(), &ids::now_iso8601(), &actor, args.comment)
        .map_err(approval_err)?;
    write_approval_state(&paths, &state)?;
    println!("status={}", state.status);
    Ok(0)
}

fn cmd_adapter(action: AdapterAction) -> Result<i32, GovError> {
    match action {
        AdapterAction::Apply { session, live_apply } => adapter_apply(session, live_apply, false),
        AdapterAction::ApplyLowRisk { session, live_apply } => adapter_apply(session, live_apply, true),
        AdapterAction::Rollback { session, execution_id } => {
            let paths = SessionPaths::new(&session.out_dir, &session.session);
            let ledger = JsonlStream::open(paths.execution_ledger()).map_err(event_log_err)?;
            let record = adapter::rollback(
                &ledger,
                ids::next_record_id(),
                ids::now_ms(),
                &ids::now_iso8601(),
                &execution_id,
                ids::new_execution_id(),
            )
            .map_err(adapter_err)?;
            let text = serde_json::to_string_pretty(&record)?;
            std::fs::write(paths.adapter(), text)?;
            println!("result={:?}", record.result);
            Ok(0)
        }
    }
}

fn adapter_apply(session: SessionArgs, live_apply: bool, low_risk_only: bool) -> Result<i32, GovError> {
    let paths = SessionPaths::new(&session.out_dir, &session.session);
    let plan: plan_synth::ChangePlan = require_json(&paths.change_plan())?;
    let policy = Policy::load(None).map_err(policy_err)?;
    let state = load_approval_state(&paths)?;
    let approved = state.status == gov_core::ApprovalStatus::Approved || state.status == gov_core::ApprovalStatus::Executed;
    let ledger = JsonlStream::open(paths.execution_ledger()).map_err(event_log_err)?;
    let client = SimulatedErpClient;
    let opts = ApplyOptions { live_apply, dry_run: !live_apply, allow_suggestion_apply: false };
    let outcome = if low_risk_only {
        adapter::apply_low_risk(
            &plan,
            &policy.catalog,
            approved,
            &client,
            &ledger,
            ids::next_record_id(),
            ids::now_ms(),
            &ids::now_iso8601(),
            ids::new_execution_id(),
            opts,
        )
    } else {
        adapter::apply(
            &plan,
            &policy.catalog,
            approved,
            &client,
            &ledger,
            ids::next_record_id(),
            ids::now_ms(),
            &ids::now_iso8601(),
            ids::new_execution_id(),
            opts,
        )
    }
    .map_err(adapter_err)?;
    let text = serde_json::to_string_pretty(&outcome.record)?;
    std::fs::write(paths.adapter(), text)?;
    println!("result={:?} blocked={}", outcome.record.result, outcome.blocked);
    if outcome.blocked {
        return Err(GovError::ExecutionBlocked(outcome.reason.unwrap_or_else(|| "apply blocked".to_string())));
    }
    Ok(0)
}

fn cmd_feedback(action: FeedbackAction) -> Result<i32, GovError> {
    let FeedbackAction::Record { session, user, score, channel, comment, tag } = action;
    let paths = SessionPaths::new(&session.out_dir, &session.session);
    let log = JsonlStream::open(paths.feedback()).map_err(event_log_err)?;
    let feedback = FeedbackRecord {
        feedback_id: ids::new_feedback_id(),
        timestamp: ids::now_iso8601(),
        user_id: user,
        session_id: session.session,
        score,
        comment,
        tags: tag,
        channel,
        intent_id: None,
        plan_id: None,
        execution_id: None,
        product: None,
        module: None,
        page: None,
        scene_id: None,
    };
    let recorded = signals::record(&log, ids::next_record_id(), ids::now_ms(), feedback)
        .map_err(|e| GovError::Config(e.to_string()))?;
    println!("{}", serde_json::to_string_pretty(&recorded)?);
    Ok(0)
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, GovError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let log = JsonlStream::open(path).map_err(event_log_err)?;
    let rows: Vec<event_log::EventRecord<T>> = log.read_all().map_err(event_log_err)?;
    Ok(rows.into_iter().map(|r| r.payload).collect())
}

fn cmd_report(args: ReportArgs) -> Result<i32, GovError> {
    let policy = Policy::load(None).map_err(policy_err)?;
    let now = Utc::now();

    let window = match (&args.from, &args.to) {
        (Some(from), Some(to)) => {
            let from = DateTime::parse_from_rfc3339(from)
                .map_err(|e| GovError::Config(format!("invalid --from: {e}")))?
                .with_timezone(&Utc);
            let to = DateTime::parse_from_rfc3339(to)
                .map_err(|e| GovError::Config(format!("invalid --to: {e}")))?
                .with_timezone(&Utc);
            Window::Custom { from, to }
        }
        _ => match args.window {
            WindowArg::Weekly => Window::Weekly,
            WindowArg::Monthly => Window::Monthly,
            WindowArg::All => Window::All,
        },
    };

    let global_signals: Vec<Signal> = read_jsonl(&args.signals_dir.join("interactive-signals.jsonl"))?;
    let dialogue: Vec<Signal> =
        global_signals.iter().filter(|s| s.stage == SignalStage::DialogueAuthorization).cloned().collect();
    let runtime: Vec<Signal> = global_signals.iter().filter(|s| s.stage == SignalStage::Runtime).cloned().collect();
    let authorization_tier: Vec<Signal> =
        global_signals.iter().filter(|s| s.stage == SignalStage::AuthorizationTier).cloned().collect();
    let matrix: Vec<Signal> = global_signals.iter().filter(|s| s.stage == SignalStage::Matrix).cloned().collect();

    let dialogue = filter_signals(&dialogue, window, now);
    let runtime = filter_signals(&runtime, window, now);
    let authorization_tier = filter_signals(&authorization_tier, window, now);
    let matrix = filter_signals(&matrix, window, now);

    let mut feedback: Vec<FeedbackRecord> = Vec::new();
    let mut intent_total: u64 = 0;
    let mut execution = ExecutionCounts::default();

    if args.signals_dir.is_dir() {
        for entry in std::fs::read_dir(&args.signals_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let session_dir = entry.path();
            feedback.extend(read_jsonl::<FeedbackRecord>(&session_dir.join("interactive-user-feedback.jsonl"))?);
            if session_dir.join("interactive-change-intent.json").exists() {
                intent_total += 1;
            }
            let records: Vec<adapter::ExecutionRecord> =
                read_jsonl(&session_dir.join("interactive-execution-ledger.jsonl"))?;
            for record in records {
                match record.result {
                    adapter::ExecutionResult::Success => execution.success += 1,
                    adapter::ExecutionResult::Failed => execution.failed += 1,
                    adapter::ExecutionResult::Skipped => execution.skipped += 1,
                    adapter::ExecutionResult::RolledBack => execution.rolled_back += 1,
                }
            }
        }
    }
    let feedback = filter_feedback(&feedback, window, now);

    let inputs = ReportInputs {
        dialogue: &dialogue,
        runtime: &runtime,
        authorization_tier: &authorization_tier,
        matrix: &matrix,
        feedback: &feedback,
        intent_total,
        execution,
    };
    let report = generate(inputs, &policy.governance_thresholds);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.fail_on_alert && report.summary.breaches > 0 {
        return Ok(2);
    }
    Ok(0)
}
