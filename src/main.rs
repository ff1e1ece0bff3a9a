use std::io::{self, BufRead};
use std::sync::Arc;

mod macros;
mod scripting;
mod state;

use macros::MacroLibrary;
use scripting::ScriptEngine;
use state::{ProgressObserver, ProgressStore};

/// Console stand-in for the ring views: prints each update it receives.
struct ConsoleRings;

impl ProgressObserver for ConsoleRings {
    fn inner_progress_update(&self, progress: f64) {
        println!("  inner  -> {progress:.2}");
    }

    fn middle_progress_update(&self, progress: f64) {
        println!("  middle -> {progress:.2}");
    }

    fn outer_progress_update(&self, progress: f64) {
        println!("  outer  -> {progress:.2}");
    }
}

fn print_help() {
    println!("commands:");
    println!("  list                list the macro slots");
    println!("  run <index>         run a macro");
    println!("  src <index>         print a macro's source");
    println!("  show                print the ring values");
    println!("  set <ring> <value>  set inner/middle/outer directly");
    println!("  edit <index> <src>  replace a macro's source (a closure)");
    println!("  eval <script>       evaluate a script string");
    println!("  quit                exit");
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut engine = ScriptEngine::new();
    engine.set_error_handler(|message| eprintln!("script error: {message}"));

    let store = ProgressStore::new();
    engine.add_binding(&store);
    store.set_observer(Arc::new(ConsoleRings));

    let mut library = MacroLibrary::load_default(&mut engine);
    if library.is_empty() {
        println!("no macros loaded");
    }

    println!("rondel - macro-driven progress rings");
    print_help();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (command, rest) = match trimmed.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (trimmed, ""),
        };

        match command {
            "help" => print_help(),
            "list" => {
                for (index, title) in library.titles().enumerate() {
                    println!("  {index}: {title}");
                }
            }
            "show" => {
                println!(
                    "  inner {:.2}  middle {:.2}  outer {:.2}",
                    store.inner(),
                    store.middle(),
                    store.outer()
                );
            }
            "run" => match rest.parse::<usize>() {
                Ok(index) if index < library.len() => {
                    library.run(&mut engine, index);
                }
                _ => println!("usage: run <index 0..{}>", library.len()),
            },
            "src" => match rest.parse::<usize>().ok().and_then(|index| library.get(index)) {
                Some(slot) => {
                    let status = if slot.method.is_ready() {
                        ""
                    } else {
                        " [not compiled]"
                    };
                    println!("  {} ({}){status}", slot.title, slot.method.key());
                    println!("{}", slot.method.source());
                }
                None => println!("usage: src <index>"),
            },
            "set" => {
                let parsed = rest
                    .split_once(' ')
                    .and_then(|(ring, value)| value.trim().parse::<f64>().ok().map(|v| (ring, v)));
                match parsed {
                    Some(("inner", value)) => store.set_inner(value),
                    Some(("middle", value)) => store.set_middle(value),
                    Some(("outer", value)) => store.set_outer(value),
                    _ => println!("usage: set <inner|middle|outer> <value>"),
                }
            }
            "edit" => {
                let parsed = rest
                    .split_once(' ')
                    .and_then(|(index, source)| index.parse::<usize>().ok().map(|i| (i, source)));
                match parsed {
                    Some((index, source)) => {
                        if !library.set_source(&mut engine, index, source) {
                            println!("no macro slot {index}");
                        }
                    }
                    None => println!("usage: edit <index> <closure source>"),
                }
            }
            "eval" => {
                if let Ok(value) = engine.evaluate(rest) {
                    if !value.is_unit() {
                        println!("  {value}");
                    }
                }
            }
            "quit" | "exit" => break,
            _ => println!("unknown command, try `help`"),
        }
    }

    Ok(())
}
