use capturing_logger::{CaptureLogger, Level, LoggerRegistry, Marker, assert_that, context_map};

#[derive(Debug, thiserror::Error)]
#[error("card declined")]
struct Declined;

fn checkout(user: &str, amount: u32) -> Result<(), Declined> {
    context_map().put("user_id", user);
    log::info!(target: "checkout", amount = amount; "Starting checkout");

    let result = if amount > 100 { Err(Declined) } else { Ok(()) };
    if let Err(err) = &result {
        log::warn!(target: "checkout", "Payment failed: {err}");
    }

    context_map().remove("user_id");
    result
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    CaptureLogger::global().try_init()?;
    let registry = LoggerRegistry::global();
    // Echo what is captured so the demo shows some output.
    registry.set_print_level(Some(Level::Info));

    checkout("12345", 40)?;
    let _ = checkout("12345", 400);

    let audit = registry.logger("audit");
    audit.info_with_marker(&Marker::new("AUDIT"), "{} checkouts processed", &[2.into()]);

    let checkout_logger = registry.logger("checkout");
    assert_that(&checkout_logger)
        .using_mdc_comparator(capturing_logger::MdcComparator::Containing)
        .has_level(Level::Info)
        .has_number_of_logs(2);
    assert_that(&checkout_logger)
        .has_level(Level::Warn)
        .has_message_containing("card declined");

    for event in registry.logging_events() {
        println!("{}", serde_json::to_string(&event)?);
    }

    Ok(())
}
