use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::app::{AppContext, GradewatchError, Result};
use crate::daemon::{Daemon, DaemonConfig};
use crate::domain::{ClassSnapshot, ClassSpec, CrawlerConfig, Credentials, User, UserResults};
use crate::scheduler::RunReport;

pub struct NewUser {
    pub email: String,
    pub first: String,
    pub last: String,
    pub code: String,
    pub nip: String,
    pub notify: Option<String>,
}

pub fn add_user(ctx: &AppContext, new: NewUser) -> Result<User> {
    if ctx
        .store
        .list_users()?
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(&new.email))
    {
        return Err(GradewatchError::Other(format!(
            "User already exists: {}",
            new.email
        )));
    }

    let user = User::new(new.email, new.first, new.last);
    ctx.store.add_user(&user)?;

    let mut config = CrawlerConfig::new(&user.id, Credentials::new(new.code, new.nip));
    config.notification_email = new.notify.unwrap_or_default();
    ctx.store.update_crawler_config(&config)?;
    ctx.store.update_results(&UserResults::new(&user.id))?;

    println!("Added user {} ({})", user.display_name(), user.id);
    Ok(user)
}

pub fn add_class(ctx: &AppContext, user_id: &str, spec: ClassSpec) -> Result<()> {
    let user = ctx
        .store
        .get_user(user_id)?
        .ok_or_else(|| GradewatchError::UserNotFound(user_id.to_string()))?;

    let mut results = ctx.store.get_results(&user.id)?;
    if results.classes.iter().any(|c| c.spec == spec) {
        println!("Class already watched: {}", spec.display_name());
        return Ok(());
    }

    println!("Watching {} for {}", spec.display_name(), user.display_name());
    results.classes.push(ClassSnapshot::empty(spec));
    ctx.store.update_results(&results)?;
    Ok(())
}

pub fn list(ctx: &AppContext) -> Result<()> {
    let users = ctx.store.list_users()?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    for user in users {
        let config = ctx.store.get_crawler_config(&user.id)?;
        let results = ctx.store.get_results(&user.id)?;

        let status = match &config {
            Some(c) if c.enabled => "enabled",
            Some(_) => "disabled",
            None => "not configured",
        };
        let updated = results
            .last_update
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "{} <{}> [{}]\n  id: {}\n  last checked: {}",
            user.display_name(),
            user.email,
            status,
            user.id,
            updated
        );

        for class in &results.classes {
            print_class(class);
        }
    }

    Ok(())
}

fn print_class(class: &ClassSnapshot) {
    println!("  {} ({} results)", class.spec.display_name(), class.results.len());
    for entry in &class.results {
        println!(
            "    {:<30} {:>8} (avg {})",
            entry.name, entry.normal.result, entry.normal.average
        );
    }
    if let Some(total) = &class.total {
        println!("    {:<30} {:>8} (avg {})", "Total", total.result, total.average);
    }
    if let Some(grade) = &class.final_grade {
        println!("    Final grade: {}", grade);
    }
}

/// Run one user through a scheduler and wait for the report.
pub async fn refresh(ctx: &AppContext, user_id: &str) -> Result<RunReport> {
    let user = ctx
        .store
        .get_user(user_id)?
        .ok_or_else(|| GradewatchError::UserNotFound(user_id.to_string()))?;

    let scheduler = ctx.scheduler()?;
    let running = Arc::clone(&scheduler);
    let handle = tokio::spawn(async move { running.start().await });

    let report = scheduler.queue(&user).await;
    scheduler.stop();
    let _ = handle.await;
    let report = report?;

    print_report(&user, &report);
    Ok(report)
}

fn print_report(user: &User, report: &RunReport) {
    println!("Refreshed {}", user.display_name());
    for (index, error) in &report.errors {
        eprintln!("  class #{}: {}", index + 1, error);
    }
    match report.changed_classes {
        0 => println!("No new results"),
        n => println!(
            "New results in {} class(es){}",
            n,
            if report.notified { ", notification sent" } else { "" }
        ),
    }
}

pub async fn start_daemon(
    ctx: &AppContext,
    config_path: Option<&Path>,
    foreground: bool,
    no_initial_refresh: bool,
) -> Result<()> {
    if Daemon::is_running() {
        println!("{}", crate::daemon::daemon_status());
        return Ok(());
    }

    let options = ctx.config.scheduler_options()?;
    println!(
        "Starting daemon: {} workers, checking every {}, refreshing each user every {}",
        ctx.config.scheduler.workers,
        DaemonConfig::format_interval(options.check_interval.as_secs()),
        DaemonConfig::format_interval(options.refresh_interval.as_secs())
    );

    if !foreground {
        return spawn_detached(config_path, no_initial_refresh);
    }

    let daemon = Daemon::new(
        ctx.scheduler()?,
        DaemonConfig {
            refresh_on_start: !no_initial_refresh,
        },
    );
    daemon.run().await
}

/// Re-launch this binary in the foreground with its output detached.
fn spawn_detached(config_path: Option<&Path>, no_initial_refresh: bool) -> Result<()> {
    let exe = std::env::current_exe()?;
    let mut command = Command::new(exe);
    if let Some(path) = config_path {
        command.arg("--config").arg(path);
    }
    command.args(["daemon", "start", "--foreground"]);
    if no_initial_refresh {
        command.arg("--no-initial-refresh");
    }

    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    println!("Daemon started (PID: {})", child.id());
    Ok(())
}
