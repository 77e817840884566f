//! Console summary: endpoint table plus auth statistics.
//!
//! By default only unprotected and unknown endpoints are listed; the table
//! is an audit surface, not a sitemap. `--show-all` lists everything.

use crate::model::{AuthStatus, HttpVerb, ResolvedEndpoint};
use colored::Colorize;

const CONTROLLER_COLUMN_WIDTH: usize = 44;

/// Print the endpoint table and summary statistics to stderr.
pub fn print_report(endpoints: &[ResolvedEndpoint], show_all: bool) {
    if endpoints.is_empty() {
        eprintln!("{}", "No endpoints discovered.".yellow());
        return;
    }

    let mut rows: Vec<&ResolvedEndpoint> = endpoints
        .iter()
        .filter(|ep| show_all || ep.auth_status != AuthStatus::Authenticated)
        .collect();
    rows.sort_by(|a, b| {
        (a.record.path.as_str(), a.record.verb.as_str())
            .cmp(&(b.record.path.as_str(), b.record.verb.as_str()))
    });

    let title = if show_all {
        "Discovered endpoints"
    } else {
        "Unprotected and unknown endpoints"
    };
    eprintln!();
    eprintln!("{}", title.bold());
    eprintln!(
        "{:<8} {:<40} {:<44} {}",
        "Method".bold(),
        "Path".bold(),
        "Controller#Action".bold(),
        "Auth".bold()
    );

    for ep in rows {
        eprintln!(
            "{:<8} {:<40} {:<44} {}",
            colorize_verb(ep.record.verb),
            ep.record.path,
            controller_action(ep),
            auth_display(ep)
        );
    }

    eprintln!();
    print_summary(endpoints);
}

fn print_summary(endpoints: &[ResolvedEndpoint]) {
    let total = endpoints.len();
    let authenticated = count(endpoints, AuthStatus::Authenticated);
    let unprotected = count(endpoints, AuthStatus::Unprotected);
    let unknown = count(endpoints, AuthStatus::Unknown);
    let conditional = endpoints
        .iter()
        .filter(|e| e.record.flags.conditional)
        .count();
    let engines = endpoints
        .iter()
        .filter(|e| e.record.flags.engine_mount)
        .count();
    let dynamic = endpoints.iter().filter(|e| e.record.flags.dynamic).count();

    eprintln!("{}", "Summary:".bold());
    eprintln!("  Total endpoints:   {}", total);
    eprintln!(
        "  Authenticated:     {:>4}  ({}%)",
        authenticated,
        percent(authenticated, total)
    );
    if unprotected > 0 {
        eprintln!(
            "{}",
            format!(
                "  UNPROTECTED:       {:>4}  ({}%)",
                unprotected,
                percent(unprotected, total)
            )
            .red()
            .bold()
        );
    } else {
        eprintln!("  UNPROTECTED:          0  (0%)");
    }
    if unknown > 0 {
        eprintln!(
            "  Unknown auth:      {:>4}  ({}%)",
            unknown,
            percent(unknown, total)
        );
    }
    if conditional > 0 {
        eprintln!(
            "  Conditional:       {:>4}  ({}%)",
            conditional,
            percent(conditional, total)
        );
    }
    if engines > 0 {
        eprintln!(
            "  Mounted engines:   {:>4}  ({}%)",
            engines,
            percent(engines, total)
        );
    }
    if dynamic > 0 {
        eprintln!(
            "{}",
            format!(
                "  Dynamic routes:    {:>4}  ({}%)",
                dynamic,
                percent(dynamic, total)
            )
            .yellow()
        );
    }
    eprintln!();
}

fn count(endpoints: &[ResolvedEndpoint], status: AuthStatus) -> usize {
    endpoints
        .iter()
        .filter(|e| e.auth_status == status && !e.record.flags.engine_mount)
        .count()
}

fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        part * 100 / total
    }
}

fn colorize_verb(verb: HttpVerb) -> colored::ColoredString {
    let padded = format!("{:<8}", verb.as_str());
    match verb {
        HttpVerb::Get => padded.green(),
        HttpVerb::Post => padded.yellow(),
        HttpVerb::Put | HttpVerb::Patch => padded.blue(),
        HttpVerb::Delete => padded.red(),
        HttpVerb::Any => padded.magenta(),
        _ => padded.normal(),
    }
}

/// `Controller#action` cell, truncated to the column width.
fn controller_action(ep: &ResolvedEndpoint) -> String {
    if ep.record.flags.engine_mount {
        return format!("[engine] {}", ep.record.controller_class);
    }
    let controller = if ep.record.controller_class.is_empty() {
        "?"
    } else {
        &ep.record.controller_class
    };
    let action = if ep.record.action.is_empty() {
        "?"
    } else {
        &ep.record.action
    };
    let display = format!("{}#{}", controller, action);
    if display.len() > CONTROLLER_COLUMN_WIDTH {
        format!("{}...", &display[..CONTROLLER_COLUMN_WIDTH - 3])
    } else {
        display
    }
}

fn auth_display(ep: &ResolvedEndpoint) -> colored::ColoredString {
    if ep.record.flags.engine_mount {
        return "engine".magenta();
    }
    match ep.auth_status {
        AuthStatus::Authenticated => {
            let filters: Vec<&str> = ep
                .effective_filters
                .iter()
                .filter(|f| crate::controller_analyzer::is_auth_filter(f))
                .map(String::as_str)
                .take(2)
                .collect();
            format!("ok: {}", filters.join(", ")).green()
        }
        AuthStatus::Unprotected => "NONE".red().bold(),
        AuthStatus::Unknown => "? unknown".yellow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EndpointRecord, SourceLocation};

    fn endpoint(verb: HttpVerb, path: &str, auth: AuthStatus) -> ResolvedEndpoint {
        ResolvedEndpoint {
            record: EndpointRecord::new(
                verb,
                path,
                "UsersController",
                "index",
                SourceLocation::new("config/routes.rb", 1),
            ),
            auth_status: auth,
            effective_filters: vec!["authenticate_user!".to_string()],
            request_schema: None,
        }
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn test_controller_action_formatting() {
        let ep = endpoint(HttpVerb::Get, "/users", AuthStatus::Authenticated);
        assert_eq!(controller_action(&ep), "UsersController#index");
    }

    #[test]
    fn test_controller_action_truncation() {
        let mut ep = endpoint(HttpVerb::Get, "/x", AuthStatus::Unknown);
        ep.record.controller_class =
            "Some::Extremely::Deeply::Nested::Module::NamespaceController".to_string();
        let display = controller_action(&ep);
        assert!(display.len() <= CONTROLLER_COLUMN_WIDTH);
        assert!(display.ends_with("..."));
    }

    #[test]
    fn test_engine_mount_cell() {
        let mut ep = endpoint(HttpVerb::Any, "/sidekiq", AuthStatus::Unknown);
        ep.record.flags.engine_mount = true;
        ep.record.controller_class = "Sidekiq::Web".to_string();
        assert_eq!(controller_action(&ep), "[engine] Sidekiq::Web");
    }

    #[test]
    fn test_report_does_not_panic() {
        let endpoints = vec![
            endpoint(HttpVerb::Get, "/users", AuthStatus::Authenticated),
            endpoint(HttpVerb::Post, "/webhooks", AuthStatus::Unprotected),
            endpoint(HttpVerb::Get, "/mystery", AuthStatus::Unknown),
        ];
        print_report(&endpoints, false);
        print_report(&endpoints, true);
        print_report(&[], false);
    }
}
