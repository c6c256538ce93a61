use std::env;
use std::fs;
use std::process;

use log::{debug, info};

use zcore::config::Config;
use zcore::dictionary::Dictionary;
use zcore::header::{HeaderSummary, StoryHeader};
use zcore::quetzal::{FileSaveStore, PortableGameState, SaveGameDataStore};
use zcore::vm::Game;

struct Options {
    story: String,
    objects: bool,
    dictionary: bool,
    save: Option<String>,
    config: Option<String>,
}

fn usage(program: &str) {
    println!("zinfo - inspect Z-Machine story files and Quetzal saves");
    println!();
    println!(
        "Usage: {} <story> [--objects] [--dictionary] [--save file.qzl] [--config file.toml]",
        program
    );
    println!("Examples:");
    println!("  {} resources/test/minizork.z3 --objects", program);
    println!("  {} resources/test/minizork.z3 --save game.qzl", program);
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        story: args[1].clone(),
        objects: false,
        dictionary: false,
        save: None,
        config: None,
    };
    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--objects" => options.objects = true,
            "--dictionary" => options.dictionary = true,
            "--save" => {
                options.save = Some(rest.next().ok_or("--save needs a file")?.clone());
            }
            "--config" => {
                options.config = Some(rest.next().ok_or("--config needs a file")?.clone());
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
    }
    Ok(options)
}

fn print_objects(game: &Game) {
    let tree = game.object_tree();
    let codec = game.text_codec();
    let memory = &game.memory;
    let count = tree.object_count(memory);
    println!("\n{} objects", count);
    for object in 1..=count as u16 {
        let name = match tree.properties_description_address(memory, object) {
            Ok(address) => codec.decode(memory, address, 0),
            Err(e) => format!("<{}>", e),
        };
        let parent = tree.parent(memory, object).unwrap_or(0);
        let attributes = tree.attributes(memory, object).unwrap_or_default();
        println!(
            "{:4}. parent {:4}  attributes {:?}  \"{}\"",
            object, parent, attributes, name
        );
    }
}

fn print_dictionary(game: &Game) {
    let codec = game.text_codec();
    let dictionary = Dictionary::new(&game.memory);
    println!("\n{}", dictionary);
    for index in 0..dictionary.number_of_entries {
        print!("{:>10}", dictionary.word(&codec, &game.memory, index));
        if index % 6 == 5 {
            println!();
        }
    }
    println!();
}

fn print_save(game: &Game, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let form = FileSaveStore::new(path).retrieve_form_chunk()?;
    println!("\n{}", form);

    let mut state = PortableGameState::new();
    state.read_save_game(&form)?;
    if let Some(saved) = state.state() {
        println!(
            "Release {} serial {} checksum {:#06x} pc {:#06x}",
            saved.release,
            saved.serial_string(),
            saved.checksum,
            saved.pc
        );
        for (i, frame) in saved.frames.iter().enumerate() {
            println!(
                "  frame {}: return {:#06x}, {} locals, {} args, {} stack",
                i,
                frame.return_pc,
                frame.locals.len(),
                frame.num_args,
                frame.stack.len()
            );
        }
        let matches = saved.release == game.memory.release()
            && saved.serial == game.memory.serial_bytes()
            && saved.checksum == game.memory.checksum();
        println!(
            "{}",
            if matches {
                "Save matches this story"
            } else {
                "Save belongs to a different story"
            }
        );
    }
    Ok(())
}

fn run(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &options.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    debug!("Loading Z-Machine story: {}", options.story);
    let data = fs::read(&options.story)
        .map_err(|e| format!("Cannot read story file '{}': {}", options.story, e))?;
    let game = Game::with_config(data, config)?;

    println!("{}", HeaderSummary(&game.memory));
    if !game.verify_checksum() {
        info!(
            "Checksum mismatch: header {:#06x}, calculated {:#06x}",
            game.memory.checksum(),
            game.calculate_checksum()
        );
    }

    if options.objects {
        print_objects(&game);
    }
    if options.dictionary {
        print_dictionary(&game);
    }
    if let Some(path) = &options.save {
        print_save(&game, path)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        return;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
