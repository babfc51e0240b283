use std::time::Duration;

use capturing_logger::{
    CaptureLogger, ContextMapConfig, FutureExt, Level, LoggerRegistry, Settings,
};

fn try_init_logger() -> Result<&'static LoggerRegistry, Box<dyn std::error::Error>> {
    let registry: &'static LoggerRegistry = Box::leak(Box::new(LoggerRegistry::new(Settings {
        print_level: Some(Level::Info),
        context_map: ContextMapConfig {
            inherit_across_fork: true,
            ..ContextMapConfig::default()
        },
        ..Settings::default()
    })));
    CaptureLogger::new(registry).try_init()?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = try_init_logger()?;
    let mdc = registry.context_map();

    log::info!(target: "demo", "Initialized capturing logger");

    mdc.put("user_id", "12345");
    let first_future = async move {
        log::info!(target: "demo", "Logging in");
        mdc.put("action", "login");
        tokio::task::yield_now().await;
        log::info!(target: "demo", "User logged in successfully");

        tokio::time::sleep(Duration::from_millis(100)).await;
        log::info!(target: "demo", "Login completed");
    }
    .in_context(mdc.fork());

    mdc.set_context_map([("name", "Alice"), ("email", "alice@example.com")]);
    let second_future = async move {
        tokio::task::yield_now().await;

        log::info!(target: "demo", "Another future pending");
        tokio::time::sleep(Duration::from_millis(100)).await;
        log::info!(target: "demo", "Future completed");
    }
    .in_context(mdc.fork());

    mdc.set_context_map([("name", "Bob"), ("email", "bob@example.com")]);
    let third_future = tokio::spawn(
        async move {
            tokio::task::yield_now().await;

            log::info!(target: "demo", "Third future pending");
            tokio::time::sleep(Duration::from_millis(100)).await;

            mdc.put("operation", "logout");
            log::info!(target: "demo", "Third future completed");
        }
        .in_context(mdc.fork()),
    );

    let ((), (), res) = tokio::join!(first_future, second_future, third_future);
    res?;

    mdc.clear();
    log::info!(target: "demo", "Last call completed");

    let events = registry.logger("demo").all_logging_events();
    println!("captured {} events", events.len());
    for event in &events {
        println!("{:<30} {:?}", event.message(), event.mdc());
    }

    Ok(())
}
