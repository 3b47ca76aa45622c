//! Interactive menu shown when no action is given on the command line.

use std::str::FromStr;

use anyhow::Result;

use crate::commands::{self, Session};

const MENU: &str = "\
Chrome policy tool
  1) Apply policy temporarily (until reboot)
  2) Apply policy permanently (needs rootfs verification disabled)
  3) Disable rootfs verification
  4) Fetch the latest policy
  5) Exit";

/// One entry of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ApplyTemporary,
    ApplyPermanent,
    DisableVerification,
    Fetch,
    Exit,
}

impl FromStr for MenuChoice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(MenuChoice::ApplyTemporary),
            "2" => Ok(MenuChoice::ApplyPermanent),
            "3" => Ok(MenuChoice::DisableVerification),
            "4" => Ok(MenuChoice::Fetch),
            "5" | "q" | "quit" | "exit" => Ok(MenuChoice::Exit),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    AwaitingChoice,
    Acquiring,
    ApplyingTemp,
    ApplyingPerm,
    Disabling,
    Exited,
}

impl From<MenuChoice> for MenuState {
    fn from(choice: MenuChoice) -> Self {
        match choice {
            MenuChoice::ApplyTemporary => MenuState::ApplyingTemp,
            MenuChoice::ApplyPermanent => MenuState::ApplyingPerm,
            MenuChoice::DisableVerification => MenuState::Disabling,
            MenuChoice::Fetch => MenuState::Acquiring,
            MenuChoice::Exit => MenuState::Exited,
        }
    }
}

/// Run the menu until an action finishes or the user exits.
///
/// Fetching returns to the menu, even when it failed. The apply and disable
/// actions end the menu and their result becomes the result of the run.
/// Failing to read input aborts immediately.
pub fn run_menu(session: &mut Session<'_>, update: bool) -> Result<()> {
    let mut state = MenuState::AwaitingChoice;
    let mut result = Ok(());

    while state != MenuState::Exited {
        state = match state {
            MenuState::AwaitingChoice => {
                session.prompter.show(MENU)?;
                match session.prompter.read_line("Select an option [1-5]: ")? {
                    None => MenuState::Exited,
                    Some(line) => match line.parse::<MenuChoice>() {
                        Ok(choice) => choice.into(),
                        Err(()) => {
                            session
                                .prompter
                                .show(&format!("Invalid choice '{line}', enter 1-5."))?;
                            MenuState::AwaitingChoice
                        }
                    },
                }
            }
            MenuState::Acquiring => {
                if let Err(e) = commands::cmd_fetch(session) {
                    log::error!("{e:#}");
                }
                MenuState::AwaitingChoice
            }
            MenuState::ApplyingTemp => {
                result = commands::cmd_apply_temporary(session, update);
                MenuState::Exited
            }
            MenuState::ApplyingPerm => {
                result = commands::cmd_apply_permanent(session, update);
                MenuState::Exited
            }
            MenuState::Disabling => {
                result = commands::cmd_disable_verification(session);
                MenuState::Exited
            }
            MenuState::Exited => MenuState::Exited,
        };
    }

    result
}
