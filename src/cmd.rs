//! Command implementations for the CLI interface.
//!
//! Each subcommand maps onto one store action or one derived view. The
//! store owns the optimistic protocol and the success/failure toasts; the
//! handlers here only resolve identifiers, format tables, and decide the
//! process exit.

use std::io::{self, Write};
use std::path::Path;

use chrono::{Duration, Local, NaiveDate, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use reqwest::Url;

use crate::budget;
use crate::fields::{
    format_challenge, format_priority, format_status, Challenge, EnergyLevel, Priority,
    QuestCompletionMode, SortKey,
};
use crate::gateway::{ApiError, HttpGateway};
use crate::mission::{
    CreateMissionInput, CreateQuestInput, Mission, MissionPatch, Quest, QuestPatch,
};
use crate::notify::ConsoleNotifier;
use crate::session::LocalState;
use crate::store::{Store, StoreError};
use crate::timer::{format_remaining, TimerSnapshot};
use crate::views;

pub type Ctl = Store<HttpGateway, ConsoleNotifier>;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and save a session token.
    Login {
        /// Account email.
        email: String,
        /// Password. Prompted on stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the saved session token.
    Logout,

    /// Add a new mission.
    Add {
        /// Short title for the mission.
        title: String,
        /// Optional longer notes.
        #[arg(long)]
        notes: Option<String>,
        /// Priority: urgent | high | medium | low.
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Challenge rating: low | medium | high.
        #[arg(long, value_enum)]
        challenge: Option<Challenge>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Quest ID or title to nest under.
        #[arg(long)]
        quest: Option<String>,
        /// Assignee: roster name or email.
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Update fields on a mission.
    Edit {
        /// Mission ID or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        challenge: Option<Challenge>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Quest ID or title to nest under.
        #[arg(long)]
        quest: Option<String>,
        /// Assignee: roster name or email.
        #[arg(long)]
        assignee: Option<String>,
        /// Clear the due date.
        #[arg(long)]
        clear_due: bool,
        /// Detach from its quest.
        #[arg(long)]
        clear_quest: bool,
    },

    /// List the inbox: open missions in no loadout and no quest.
    List {
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Priority)]
        sort: SortKey,
        /// Filter by assignee: roster name or email.
        #[arg(long)]
        who: Option<String>,
    },

    /// Show the viewed user's loadout board for today.
    Board,

    /// Complete a mission.
    Done {
        /// Mission ID or title.
        id: String,
    },

    /// Cancel a mission.
    Cancel {
        /// Mission ID or title.
        id: String,
    },

    /// Put a mission into today's loadout.
    Assign {
        /// Mission ID or title.
        id: String,
        /// Slot ordinal. Appended after the last occupied slot when omitted.
        #[arg(long)]
        slot: Option<String>,
        /// Mission to exchange positions with.
        #[arg(long)]
        swap_with: Option<String>,
    },

    /// Take a mission out of today's loadout.
    Clear {
        /// Mission ID or title.
        id: String,
    },

    /// Show or set today's energy level: light | medium | heavy.
    Energy {
        #[arg(value_enum)]
        level: Option<EnergyLevel>,
    },

    /// List quests.
    Quests,

    /// Manage quests.
    Quest {
        #[command(subcommand)]
        action: QuestAction,
    },

    /// Bulk-import missions, one per line, from a file or stdin.
    ///
    /// Line markers: a trailing `- urgent|high|medium|low` priority,
    /// `@today`/`@tomorrow`/`@YYYY-MM-DD` due date, `#` starts the notes.
    Import {
        /// Input file path; reads stdin when omitted.
        input: Option<String>,
    },

    /// View a single mission.
    View {
        /// Mission ID or title.
        id: String,
    },

    /// Show or switch whose loadout board is viewed.
    Viewing {
        /// Roster name or email.
        who: Option<String>,
    },

    /// Countdown timer for focused work on one mission.
    Timer {
        #[command(subcommand)]
        action: TimerAction,
    },

    /// Show or set the colour theme.
    Theme {
        name: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum QuestAction {
    /// Create a quest.
    Add {
        title: String,
        #[arg(long)]
        notes: Option<String>,
        /// Assignee: roster name or email.
        #[arg(long)]
        assignee: Option<String>,
        /// Quest leader's email.
        #[arg(long)]
        leader: Option<String>,
        /// Hex colour, e.g. #7c3aed.
        #[arg(long)]
        color: Option<String>,
    },
    /// Update fields on a quest.
    Edit {
        /// Quest ID or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        leader: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Complete a quest.
    Done {
        /// Quest ID or title.
        id: String,
        /// What happens to its open missions: cascade-done | detach-open.
        #[arg(long, value_enum)]
        mode: Option<QuestCompletionMode>,
    },
    /// Toggle tracking on a quest.
    Track {
        /// Quest ID or title.
        id: String,
    },
    /// View a quest and its open missions.
    View {
        /// Quest ID or title.
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a countdown for a mission.
    Start {
        /// Mission ID or title.
        id: String,
        /// Countdown length in minutes.
        #[arg(long, default_value_t = 25)]
        minutes: i64,
    },
    /// Show the running countdown.
    Status,
    /// Stop the countdown.
    Stop,
}

/// Exit path for a failed store action. The store has already toasted API
/// failures; this adds the auth-expiry cleanup and the unknown-id message.
pub fn bail(state: &mut LocalState, state_path: &Path, err: StoreError) -> ! {
    match &err {
        StoreError::Api(ApiError::AuthExpired) => {
            state.clear_token();
            if let Err(e) = state.save(state_path) {
                eprintln!("Failed to save state: {e}");
            }
            eprintln!("Session expired. Run `loadout login <email>` to sign in again.");
        }
        StoreError::UnknownMission(_) | StoreError::UnknownQuest(_) => eprintln!("{err}"),
        _ => {}
    }
    std::process::exit(1);
}

/// Build the store for an online command, or exit when not signed in.
pub fn build_store(state: &LocalState) -> Ctl {
    if !state.is_logged_in() {
        eprintln!("Not signed in. Run `loadout login <email>` first.");
        std::process::exit(1);
    }
    let base = match Url::parse(&state.api_url) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Invalid API URL '{}': {e}", state.api_url);
            std::process::exit(1);
        }
    };
    let gateway = match HttpGateway::new(base, state.token.clone()) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };
    let mut session = crate::session::Session::new(state.user_email.clone());
    session.viewing_user = state.initial_viewed_user();
    Store::new(gateway, ConsoleNotifier, session)
}

/// Sign in, saving token and identity to the state file.
pub async fn cmd_login(
    state: &mut LocalState,
    state_path: &Path,
    email: String,
    password: Option<String>,
) {
    if state.api_url.is_empty() {
        eprintln!("No API URL configured. Pass --api-url once to save it.");
        std::process::exit(1);
    }
    let password = password.unwrap_or_else(|| {
        print!("Password: ");
        io::stdout().flush().unwrap();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).is_err() {
            eprintln!("Failed to read password.");
            std::process::exit(1);
        }
        buf.trim_end().to_string()
    });
    let base = match Url::parse(&state.api_url) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Invalid API URL '{}': {e}", state.api_url);
            std::process::exit(1);
        }
    };
    match HttpGateway::login(base, &email, &password, std::time::Duration::from_secs(30)).await {
        Ok(outcome) => {
            state.token = outcome.token;
            state.user_email = outcome.email;
            state.expires_at = outcome.expires_at;
            if let Err(e) = state.save(state_path) {
                eprintln!("Failed to save state: {e}");
                std::process::exit(1);
            }
            println!("Signed in as {}", state.user_email);
        }
        Err(e) => {
            eprintln!("Login failed: {e}");
            std::process::exit(1);
        }
    }
}

pub fn cmd_logout(state: &mut LocalState, state_path: &Path) {
    state.clear_token();
    if let Err(e) = state.save(state_path) {
        eprintln!("Failed to save state: {e}");
        std::process::exit(1);
    }
    println!("Signed out.");
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_add(
    store: &mut Ctl,
    state: &LocalState,
    title: String,
    notes: Option<String>,
    priority: Option<Priority>,
    challenge: Option<Challenge>,
    due: Option<String>,
    quest: Option<String>,
    assignee: Option<String>,
) -> Result<(), StoreError> {
    let due_date = match due.as_deref() {
        Some(s) => match parse_due_input(s) {
            Some(d) => Some(d),
            None => {
                eprintln!("Unrecognised due date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
                std::process::exit(1);
            }
        },
        None => None,
    };
    let quest_id = match quest {
        Some(q) => Some(resolve_quest(&q, &store.collections.quests)),
        None => None,
    };
    let input = CreateMissionInput {
        title,
        notes,
        priority,
        challenge,
        assignee: assignee.map(|a| state.resolve_user(&a)),
        due_date,
        quest_id,
    };
    store.create_mission(input).await
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_edit(
    store: &mut Ctl,
    state: &LocalState,
    id: String,
    title: Option<String>,
    notes: Option<String>,
    priority: Option<Priority>,
    challenge: Option<Challenge>,
    due: Option<String>,
    quest: Option<String>,
    assignee: Option<String>,
    clear_due: bool,
    clear_quest: bool,
) -> Result<(), StoreError> {
    let task_id = resolve_mission(&id, &store.collections.missions);
    // An explicitly empty string clears the field on the wire.
    let due_date = if clear_due {
        Some(String::new())
    } else {
        match due.as_deref() {
            Some(s) => match parse_due_input(s) {
                Some(d) => Some(d.to_string()),
                None => {
                    eprintln!(
                        "Unrecognised due date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'."
                    );
                    std::process::exit(1);
                }
            },
            None => None,
        }
    };
    let quest_id = if clear_quest {
        Some(String::new())
    } else {
        quest.map(|q| resolve_quest(&q, &store.collections.quests))
    };
    let patch = MissionPatch {
        task_id,
        title,
        notes,
        priority,
        challenge,
        assignee: assignee.map(|a| state.resolve_user(&a)),
        status: None,
        due_date,
        quest_id,
    };
    store.update_mission(patch).await
}

pub fn cmd_list(store: &Ctl, state: &LocalState, sort: SortKey, who: Option<String>) {
    let assignee = who.map(|w| state.resolve_user(&w));
    let today = Local::now().date_naive();
    let view = views::inbox(&store.collections.missions, assignee.as_deref(), sort, today);

    if view.overdue.is_empty() && view.normal.is_empty() {
        println!("Inbox is empty.");
        return;
    }
    if !view.overdue.is_empty() {
        println!("Overdue:");
        print_mission_table(&view.overdue, today);
        println!();
    }
    print_mission_table(&view.normal, today);
}

pub fn cmd_board(store: &Ctl) {
    let today = Local::now().date_naive();
    let user = &store.session.viewing_user;
    println!("Loadout for {user} - {today}");
    if let Some(config) = &store.loadout {
        let flag = if budget::is_overloaded(config) {
            "  OVERLOADED"
        } else {
            ""
        };
        println!(
            "Energy: {} ({}/{} points){flag}",
            config.energy_level.as_str(),
            config.points_used,
            config.points_limit
        );
    }
    println!();

    let slots = views::loadout_missions(&store.collections.missions, user);
    if slots.is_empty() {
        println!("No missions in the loadout.");
    }
    for m in &slots {
        println!(
            "{:>3}. {:<40} {:<7} {} pt",
            m.today_slot,
            truncate(&m.title, 40),
            format_priority(m.priority),
            budget::challenge_points(m.challenge)
        );
    }

    let done = views::accomplished_today(&store.collections.completed, user, today);
    if !done.is_empty() {
        println!("\nAccomplished today:");
        for m in &done {
            println!("  * {}", m.title);
        }
    }
}

pub async fn cmd_done(store: &mut Ctl, id: String) -> Result<(), StoreError> {
    let task_id = resolve_mission(&id, &store.collections.missions);
    store.complete_mission(&task_id, Utc::now()).await
}

pub async fn cmd_cancel(store: &mut Ctl, id: String) -> Result<(), StoreError> {
    let task_id = resolve_mission(&id, &store.collections.missions);
    store.cancel_mission(&task_id).await
}

pub async fn cmd_assign(
    store: &mut Ctl,
    id: String,
    slot: Option<String>,
    swap_with: Option<String>,
) -> Result<(), StoreError> {
    let task_id = resolve_mission(&id, &store.collections.missions);
    let swap_id = swap_with.map(|s| resolve_mission(&s, &store.collections.missions));
    store
        .assign_today(&task_id, slot.as_deref(), swap_id.as_deref(), Utc::now())
        .await
}

pub async fn cmd_clear(store: &mut Ctl, id: String) -> Result<(), StoreError> {
    let task_id = resolve_mission(&id, &store.collections.missions);
    store.clear_today(&task_id).await
}

pub async fn cmd_energy(store: &mut Ctl, level: Option<EnergyLevel>) -> Result<(), StoreError> {
    match level {
        Some(level) => store.set_energy(level).await,
        None => {
            match &store.loadout {
                Some(config) => println!(
                    "Energy: {} ({}/{} points)",
                    config.energy_level.as_str(),
                    config.points_used,
                    config.points_limit
                ),
                None => println!("No energy level set."),
            }
            Ok(())
        }
    }
}

pub fn cmd_quests(store: &Ctl) {
    let open: Vec<&Quest> = store
        .collections
        .quests
        .iter()
        .filter(|q| q.status == crate::fields::Status::Open)
        .collect();
    if open.is_empty() {
        println!("No quests.");
        return;
    }
    println!("{:<10} {:<3} {:<30} {:<8} {}", "ID", "Trk", "Title", "Open", "Assignee");
    for q in open {
        let count = views::quest_missions(&store.collections.missions, &q.quest_id).len();
        println!(
            "{:<10} {:<3} {:<30} {:<8} {}",
            truncate(&q.quest_id, 10),
            if q.is_tracked { "*" } else { "" },
            truncate(&q.title, 30),
            count,
            q.assignee
        );
    }
}

pub async fn cmd_quest(
    store: &mut Ctl,
    state: &LocalState,
    action: QuestAction,
) -> Result<(), StoreError> {
    match action {
        QuestAction::Add {
            title,
            notes,
            assignee,
            leader,
            color,
        } => {
            let input = CreateQuestInput {
                title,
                notes,
                assignee: assignee.map(|a| state.resolve_user(&a)),
                leader_email: leader.map(|l| state.resolve_user(&l)),
                color,
            };
            store.create_quest(input).await
        }
        QuestAction::Edit {
            id,
            title,
            notes,
            assignee,
            leader,
            color,
        } => {
            let quest_id = resolve_quest(&id, &store.collections.quests);
            let patch = QuestPatch {
                title,
                notes,
                assignee: assignee.map(|a| state.resolve_user(&a)),
                leader_email: leader.map(|l| state.resolve_user(&l)),
                color,
                ..QuestPatch::new(quest_id)
            };
            store.update_quest(patch).await
        }
        QuestAction::Done { id, mode } => {
            let quest_id = resolve_quest(&id, &store.collections.quests);
            match store.complete_quest(&quest_id, mode, Utc::now()).await {
                Err(StoreError::OpenMissions(_)) => {
                    eprintln!("Re-run with `--mode cascade-done` or `--mode detach-open`.");
                    std::process::exit(1);
                }
                other => other,
            }
        }
        QuestAction::Track { id } => {
            let quest_id = resolve_quest(&id, &store.collections.quests);
            store.toggle_quest_tracked(&quest_id, Utc::now()).await
        }
        QuestAction::View { id } => {
            let quest_id = resolve_quest(&id, &store.collections.quests);
            let Some(q) = store.collections.quest(&quest_id) else {
                eprintln!("Quest {quest_id} not found.");
                std::process::exit(1);
            };
            println!("ID:       {}", q.quest_id);
            println!("Title:    {}", q.title);
            println!("Status:   {}", format_status(q.status));
            println!("Tracked:  {}", if q.is_tracked { "yes" } else { "no" });
            println!("Assignee: {}", dash_if_empty(&q.assignee));
            println!("Leader:   {}", dash_if_empty(&q.leader_email));
            if !q.notes.is_empty() {
                println!("Notes:\n{}", q.notes);
            }
            let missions = views::quest_missions(&store.collections.missions, &quest_id);
            println!("\nOpen missions: {}", missions.len());
            print_mission_table(&missions, Local::now().date_naive());
            Ok(())
        }
    }
}

pub async fn cmd_import(store: &mut Ctl, input: Option<String>) -> Result<(), StoreError> {
    let text = match input {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Failed to read '{path}': {e}");
                std::process::exit(1);
            }
        },
        None => {
            let mut buf = String::new();
            if io::Read::read_to_string(&mut io::stdin(), &mut buf).is_err() {
                eprintln!("Failed to read stdin.");
                std::process::exit(1);
            }
            buf
        }
    };
    store.bulk_create(&text, Local::now().date_naive()).await
}

pub fn cmd_view(store: &Ctl, id: String) {
    let task_id = resolve_mission(&id, &store.collections.missions);
    let Some(m) = store.collections.mission(&task_id) else {
        eprintln!("Mission {task_id} not found.");
        std::process::exit(1);
    };
    let today = Local::now().date_naive();
    println!("ID:        {}", m.task_id);
    println!("Title:     {}", m.title);
    println!("Status:    {}", format_status(m.status));
    println!("Priority:  {}", format_priority(m.priority));
    println!("Challenge: {}", format_challenge(m.challenge));
    println!(
        "Due:       {}",
        match m.due_date {
            Some(d) => format!("{d} ({})", format_due_relative(Some(d), today)),
            None => "-".into(),
        }
    );
    println!("Assignee:  {}", dash_if_empty(&m.assignee));
    println!("Quest:     {}", dash_if_empty(&m.quest_id));
    println!("Slot:      {}", dash_if_empty(&m.today_slot));
    if !m.notes.is_empty() {
        println!("Notes:\n{}", m.notes);
    }
}

pub fn cmd_viewing(state: &mut LocalState, state_path: &Path, who: Option<String>) {
    match who {
        None => println!("Viewing {}", state.initial_viewed_user()),
        Some(w) => {
            let email = state.resolve_user(&w);
            state.last_viewed = email.clone();
            if let Err(e) = state.save(state_path) {
                eprintln!("Failed to save state: {e}");
                std::process::exit(1);
            }
            println!("Now viewing {email}");
        }
    }
}

pub fn cmd_timer_start(store: &Ctl, state: &mut LocalState, state_path: &Path, id: String, minutes: i64) {
    if minutes <= 0 {
        eprintln!("Timer length must be positive.");
        std::process::exit(1);
    }
    let task_id = resolve_mission(&id, &store.collections.missions);
    let Some(m) = store.collections.mission(&task_id) else {
        eprintln!("Mission {task_id} not found.");
        std::process::exit(1);
    };
    state.timer = Some(TimerSnapshot::new(
        &m.task_id,
        &m.title,
        Utc::now().timestamp(),
        minutes,
    ));
    if let Err(e) = state.save(state_path) {
        eprintln!("Failed to save state: {e}");
        std::process::exit(1);
    }
    println!("Timer started: {} ({minutes} min)", m.title);
}

pub fn cmd_timer_status(state: &LocalState) {
    let Some(timer) = &state.timer else {
        println!("No timer running.");
        return;
    };
    let now = Utc::now().timestamp();
    if timer.is_finished(now) {
        println!("Time's up: {}", timer.title);
    } else {
        println!(
            "{} - {} left ({:.0}%)",
            timer.title,
            format_remaining(timer.remaining_seconds(now)),
            timer.progress_percent(now)
        );
    }
}

pub fn cmd_timer_stop(state: &mut LocalState, state_path: &Path) {
    if state.timer.take().is_none() {
        println!("No timer running.");
        return;
    }
    if let Err(e) = state.save(state_path) {
        eprintln!("Failed to save state: {e}");
        std::process::exit(1);
    }
    println!("Timer stopped.");
}

pub fn cmd_theme(state: &mut LocalState, state_path: &Path, name: Option<String>) {
    match name {
        None => println!(
            "Theme: {}",
            if state.theme.is_empty() {
                "default"
            } else {
                &state.theme
            }
        ),
        Some(name) => {
            state.theme = name;
            if let Err(e) = state.save(state_path) {
                eprintln!("Failed to save state: {e}");
                std::process::exit(1);
            }
            println!("Theme set to {}", state.theme);
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Resolve a mission identifier: exact ID, unique ID prefix, or
/// case-insensitive title.
pub fn resolve_mission(identifier: &str, missions: &[Mission]) -> String {
    if missions.iter().any(|m| m.task_id == identifier) {
        return identifier.to_string();
    }
    let prefix: Vec<&Mission> = missions
        .iter()
        .filter(|m| m.task_id.starts_with(identifier))
        .collect();
    if prefix.len() == 1 {
        return prefix[0].task_id.clone();
    }
    let by_title: Vec<&Mission> = missions
        .iter()
        .filter(|m| m.title.eq_ignore_ascii_case(identifier))
        .collect();
    match by_title.len() {
        1 => by_title[0].task_id.clone(),
        0 => {
            eprintln!("No mission found matching '{identifier}'.");
            std::process::exit(1);
        }
        _ => {
            eprintln!("Multiple missions match '{identifier}':");
            for m in by_title {
                eprintln!("  {} - {}", m.task_id, m.title);
            }
            eprintln!("Use the specific ID instead.");
            std::process::exit(1);
        }
    }
}

/// Resolve a quest identifier the same way.
pub fn resolve_quest(identifier: &str, quests: &[Quest]) -> String {
    if quests.iter().any(|q| q.quest_id == identifier) {
        return identifier.to_string();
    }
    let by_title: Vec<&Quest> = quests
        .iter()
        .filter(|q| q.title.eq_ignore_ascii_case(identifier))
        .collect();
    match by_title.len() {
        1 => by_title[0].quest_id.clone(),
        0 => {
            eprintln!("No quest found matching '{identifier}'.");
            std::process::exit(1);
        }
        _ => {
            eprintln!("Multiple quests match '{identifier}'. Use the specific ID instead.");
            std::process::exit(1);
        }
    }
}

/// Parse a due-date argument: ISO date, "today", "tomorrow", or "in Nd".
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let today = Local::now().date_naive();
    match s.to_ascii_lowercase().as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }
    if let Some(rest) = s.strip_prefix("in ").or_else(|| s.strip_prefix("in")) {
        if let Some(days) = rest.trim().strip_suffix('d') {
            if let Ok(n) = days.trim().parse::<i64>() {
                return Some(today + Duration::days(n));
            }
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Human-friendly distance to a due date.
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = d - today;
            if delta.num_days() == 0 {
                "today".into()
            } else if delta.num_days() == 1 {
                "tomorrow".into()
            } else if delta.num_days() > 1 {
                format!("in {}d", delta.num_days())
            } else {
                format!("{}d late", -delta.num_days())
            }
        }
    }
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn print_mission_table(missions: &[&Mission], today: NaiveDate) {
    println!(
        "{:<10} {:<7} {:<7} {:<10} {}",
        "ID", "Pri", "Chal", "Due", "Title"
    );
    for m in missions {
        println!(
            "{:<10} {:<7} {:<7} {:<10} {}",
            truncate(&m.task_id, 10),
            format_priority(m.priority),
            format_challenge(m.challenge),
            format_due_relative(m.due_date, today),
            m.title
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_input_handles_relative_forms() {
        let today = Local::now().date_naive();
        assert_eq!(parse_due_input("today"), Some(today));
        assert_eq!(parse_due_input("tomorrow"), Some(today + Duration::days(1)));
        assert_eq!(parse_due_input("in 3d"), Some(today + Duration::days(3)));
        assert_eq!(
            parse_due_input("2026-09-15"),
            NaiveDate::from_ymd_opt(2026, 9, 15)
        );
        assert_eq!(parse_due_input("whenever"), None);
    }

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer string", 10), "a much lo…");
    }
}
