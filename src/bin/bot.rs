use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use habit_reminders::core::Config;
use habit_reminders::database::Database;
use habit_reminders::features::accounts::AccountLinker;
use habit_reminders::features::habits::HabitService;
use habit_reminders::features::reminders::{
    HabitLifecycleHooks, NotificationDispatcher, ReminderRegistry, ReminderScheduler,
};
use habit_reminders::features::telegram::{TelegramBot, TelegramClient};
use habit_reminders::features::{get_bot_version, get_features};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("🚀 Starting habit reminder bot v{}", get_bot_version());
    for feature in get_features() {
        info!("  • {} v{}", feature.name, feature.version);
    }

    let database = Database::new(&config.database_path).await?;

    let registry = ReminderRegistry::new(Arc::new(database.clone()), config.schedule_mode);
    let hooks = HabitLifecycleHooks::new(registry.clone());
    let habits = HabitService::new(database.clone(), hooks);

    // Registry entries are durable; repair anything a crash left half-done
    match habits.resync_reminders().await {
        Ok(report) => info!(
            "Reminder registry in sync ({} re-registered, {} orphan(s) removed)",
            report.reregistered, report.orphans_removed
        ),
        Err(e) => error!("Failed to resync reminders: {e}"),
    }

    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.telegram_bot_token,
    ));

    // Start the reminder scheduler
    let dispatcher = Arc::new(NotificationDispatcher::new(database.clone(), telegram.clone()));
    let scheduler = ReminderScheduler::new(
        registry,
        dispatcher,
        config.scheduler_tick,
        config.utc_offset,
    );
    tokio::spawn(scheduler.run());

    let bot = TelegramBot::new(telegram, AccountLinker::new(database), config.poll_timeout);

    tokio::select! {
        _ = bot.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("👋 Shutting down");
        }
    }

    Ok(())
}
