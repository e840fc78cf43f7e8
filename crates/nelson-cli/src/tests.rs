use clap::Parser;
use nelson_core::Provider;

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["nelson-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Migrate));
}

#[test]
fn parses_fetch_with_provider_key() {
    let cli = Cli::try_parse_from(["nelson-cli", "fetch", "steam_developers"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Fetch {
            provider: Provider::SteamDevelopers
        }
    ));
}

#[test]
fn fetch_rejects_unknown_provider() {
    assert!(Cli::try_parse_from(["nelson-cli", "fetch", "polygon"]).is_err());
}

#[test]
fn once_defaults_to_database_store() {
    let cli = Cli::try_parse_from(["nelson-cli", "once"]).unwrap();
    assert!(matches!(cli.command, Commands::Once { dry_run: false }));
}

#[test]
fn once_dry_run() {
    let cli = Cli::try_parse_from(["nelson-cli", "once", "--dry-run"]).unwrap();
    assert!(matches!(cli.command, Commands::Once { dry_run: true }));
}

#[test]
fn recent_defaults_to_first_page() {
    let cli = Cli::try_parse_from(["nelson-cli", "recent"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Recent {
            page: 0,
            page_size: 20
        }
    ));
}

#[test]
fn recent_with_paging() {
    let cli =
        Cli::try_parse_from(["nelson-cli", "recent", "--page", "2", "--page-size", "5"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Recent {
            page: 2,
            page_size: 5
        }
    ));
}

#[test]
fn command_is_required() {
    assert!(Cli::try_parse_from(["nelson-cli"]).is_err());
}

#[test]
fn persisting_once_warns_that_items_go_unannounced() {
    let warning = commands::persist_warning(false).expect("warning for a stored cycle");
    assert!(warning.contains("never be announced"));
    assert!(warning.contains("--dry-run"));
}

#[test]
fn dry_run_once_has_no_warning() {
    assert!(commands::persist_warning(true).is_none());
}
