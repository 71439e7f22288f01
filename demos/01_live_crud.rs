//! Demo 01: CRUD with a live observer
//!
//! Walks through the five actions against a temporary store, with the change
//! observer re-rendering the item list after every mutation.
//!
//! Run with: cargo run --example 01_live_crud

use eyre::Result;
use todostore::{Action, App, Config, Label};

fn main() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config = Config::new(Some(temp_dir.path().to_path_buf()), true);

    println!("TodoStore Live CRUD Demo");
    println!("========================\n");
    println!("Store path: {}\n", config.store_path.display());

    let mut app = App::open(&config, Label::new())?;

    for action in [
        Action::Create,
        Action::Create,
        Action::Create,
        Action::Update,
        Action::DeleteFirst,
        Action::DeleteAll,
    ] {
        let before = app.sink().renders();
        app.dispatch(action)?;
        let rendered = app.sink().renders() - before;

        println!("{} (re-rendered {} time(s))", action, rendered);
        for line in app.sink().text().lines().filter(|l| !l.is_empty()) {
            println!("   {}", line);
        }
        println!();
    }

    // Cancels the observer before the store closes
    app.close()?;

    println!("Demo complete!");
    Ok(())
}
