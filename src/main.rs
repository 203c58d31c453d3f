//! # Loadout - Household Mission Tracker CLI
//!
//! A command-line client for a shared household mission and quest tracker.
//! Every mutation is optimistic against a local entity store and confirmed
//! (or rolled back) by the remote record store, so the CLI stays responsive
//! even on a slow connection.
//!
//! ## Quick Start
//!
//! ```bash
//! # Sign in once; the token is saved under ~/.loadout
//! loadout login you@example.com --api-url https://example.com/api
//!
//! # Capture a mission
//! loadout add "Fix the gate latch" --priority high --due tomorrow
//!
//! # Triage the inbox, then build today's loadout
//! loadout list
//! loadout assign "Fix the gate latch"
//! loadout board
//!
//! # Finish it
//! loadout done "Fix the gate latch"
//! ```
//!
//! ## Key Commands
//!
//! - `loadout list` - the inbox: open missions not yet slotted or nested
//! - `loadout board` - today's loadout with the energy budget
//! - `loadout assign` / `clear` - move missions in and out of today
//! - `loadout quest ...` - manage quests and tracking
//! - `loadout import` - paste a block of one-line missions
//!
//! Local state (token, roster, theme, timer) lives in `~/.loadout/` or
//! `$LOADOUT_HOME`. Logs go to stderr, controlled by `RUST_LOG`.

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod budget;
pub mod cli;
pub mod cmd;
pub mod fields;
pub mod gateway;
pub mod import;
pub mod mission;
pub mod notify;
pub mod session;
pub mod slot;
pub mod store;
pub mod timer;
pub mod views;

use chrono::Utc;
use cli::Cli;
use cmd::{
    bail, build_store, cmd_add, cmd_assign, cmd_board, cmd_cancel, cmd_clear, cmd_completions,
    cmd_done, cmd_edit, cmd_energy, cmd_import, cmd_list, cmd_login, cmd_logout, cmd_quest, cmd_quests,
    cmd_theme, cmd_timer_start, cmd_timer_status, cmd_timer_stop, cmd_view, cmd_viewing, Commands,
    TimerAction,
};
use session::{state_dir, state_file, LocalState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state_path = state_file(&state_dir());
    let mut state = LocalState::load(&state_path, Utc::now().timestamp());
    if let Some(url) = cli.api_url {
        state.api_url = url;
    }

    // Offline commands never touch the gateway.
    match cli.command {
        Commands::Login { email, password } => {
            cmd_login(&mut state, &state_path, email, password).await;
            return;
        }
        Commands::Logout => {
            cmd_logout(&mut state, &state_path);
            return;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
            return;
        }
        Commands::Theme { name } => {
            cmd_theme(&mut state, &state_path, name);
            return;
        }
        Commands::Viewing { who } => {
            cmd_viewing(&mut state, &state_path, who);
            return;
        }
        Commands::Timer {
            action: TimerAction::Status,
        } => {
            cmd_timer_status(&state);
            return;
        }
        Commands::Timer {
            action: TimerAction::Stop,
        } => {
            cmd_timer_stop(&mut state, &state_path);
            return;
        }
        _ => {}
    }

    let mut store = build_store(&state);
    if let Err(err) = store.refresh_all().await {
        bail(&mut state, &state_path, err);
    }

    let result = match cli.command {
        Commands::Login { .. }
        | Commands::Logout
        | Commands::Completions { .. }
        | Commands::Theme { .. }
        | Commands::Viewing { .. } => unreachable!("offline command handled above"),

        Commands::Add {
            title,
            notes,
            priority,
            challenge,
            due,
            quest,
            assignee,
        } => {
            cmd_add(
                &mut store, &state, title, notes, priority, challenge, due, quest, assignee,
            )
            .await
        }

        Commands::Edit {
            id,
            title,
            notes,
            priority,
            challenge,
            due,
            quest,
            assignee,
            clear_due,
            clear_quest,
        } => {
            cmd_edit(
                &mut store, &state, id, title, notes, priority, challenge, due, quest, assignee,
                clear_due, clear_quest,
            )
            .await
        }

        Commands::List { sort, who } => {
            cmd_list(&store, &state, sort, who);
            Ok(())
        }

        Commands::Board => {
            cmd_board(&store);
            Ok(())
        }

        Commands::Done { id } => cmd_done(&mut store, id).await,

        Commands::Cancel { id } => cmd_cancel(&mut store, id).await,

        Commands::Assign { id, slot, swap_with } => {
            cmd_assign(&mut store, id, slot, swap_with).await
        }

        Commands::Clear { id } => cmd_clear(&mut store, id).await,

        Commands::Energy { level } => cmd_energy(&mut store, level).await,

        Commands::Quests => {
            cmd_quests(&store);
            Ok(())
        }

        Commands::Quest { action } => cmd_quest(&mut store, &state, action).await,

        Commands::Import { input } => cmd_import(&mut store, input).await,

        Commands::View { id } => {
            cmd_view(&store, id);
            Ok(())
        }

        Commands::Timer { action } => match action {
            TimerAction::Start { id, minutes } => {
                cmd_timer_start(&store, &mut state, &state_path, id, minutes);
                Ok(())
            }
            TimerAction::Status | TimerAction::Stop => {
                unreachable!("offline timer actions handled above")
            }
        },
    };

    if let Err(err) = result {
        bail(&mut state, &state_path, err);
    }
}
