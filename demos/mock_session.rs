//! Scripted session against a simulated device
//!
//! Shows the three outcomes a caller must tell apart: a reply, no reply,
//! and a failed transaction.

use serial_commander::{
    DeviceController, Dispatcher, KeywordClassifier, MockLink, MockReply, PlainPhraser,
    TransactionConfig,
};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Serial Commander - Mock Session ===\n");

    let mut link = MockLink::new("mock0");
    link.expect_reply(&["led on", "OK:ON"]);
    link.expect_reply(&["$", "STATE:ON"]);
    link.expect_reply(&["led off"]);
    // Echo first, answer after the settle window has passed
    link.expect(
        MockReply::new()
            .immediately("status")
            .after(Duration::from_millis(250), "STATE:OFF"),
    );

    let mut controller = DeviceController::new(link, TransactionConfig::default());

    println!("led on  -> {:?}", controller.led_on()?);
    println!("status  -> {:?}", controller.status()?);
    println!("led off -> {:?}", controller.led_off()?);
    println!("status  -> {:?}", controller.status()?);

    controller.engine_mut().link_mut().fail_next_write();
    match controller.led_on() {
        Ok(response) => println!("led on  -> {:?}", response),
        Err(e) => println!("led on  -> error: {} (recoverable: {})", e, e.is_recoverable()),
    }

    println!("\n--- Dispatch ---");
    controller.engine_mut().link_mut().expect_reply(&["led on", "OK:ON"]);
    let mut dispatcher = Dispatcher::new(&mut controller, KeywordClassifier, PlainPhraser);
    for text in ["please turn on the led", "sing me a song"] {
        let turn = dispatcher.handle(text);
        println!("{:<24} [{}] {}", text, turn.intent, turn.reply);
    }

    controller.close();
    println!(
        "\nVirtual time elapsed: {:?}",
        controller.engine().link().elapsed()
    );
    Ok(())
}
