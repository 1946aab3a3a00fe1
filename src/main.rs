mod common;
mod config;
mod network;
mod service;
mod storage;

use std::error::Error;

use clap::{Parser, Subcommand};
use config::{AppConfig, ConfigOverrides};
use dotenvy::dotenv;
use network::{HttpSpamClassifier, SpamClassifier};
use serde::Serialize;
use service::ChatService;
use storage::RoomDatabase;

use crate::common::SendMessageRequest;

#[derive(Parser)]
#[command(
    name = "echoroom",
    version,
    about = "Chat message relay with spam classification"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// SQLite database holding rooms and messages
    #[arg(long, value_name = "FILE")]
    database: Option<String>,
    /// Base URL of the spam prediction service
    #[arg(long, value_name = "URL")]
    spam_api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new, empty room
    CreateRoom { room_id: String },
    /// Show a room with its full history
    JoinRoom { room_id: String },
    /// Post a message to a room
    Send {
        #[arg(long)]
        room: String,
        #[arg(long)]
        sender: String,
        content: String,
    },
    /// Read a page of a room's history (page 0 = newest)
    Messages {
        room_id: String,
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        size: usize,
    },
    /// Score text against the spam predictor without storing it
    Classify { text: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    run(Cli::parse())
        .await
        .inspect_err(|err| log::error!("{err}"))
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let overrides = ConfigOverrides {
        spam_detection_api_url: cli.spam_api_url,
        database_path: cli.database,
    };
    let app_config = config::load_config(&cli.config).merge(config::process_env, overrides);
    log::debug!("Using config {app_config:?}");

    let classifier = HttpSpamClassifier::new(&app_config.spam_detection_api_url)?;

    match cli.command {
        Command::Classify { text } => print_json(&classifier.classify(&text).await),
        Command::CreateRoom { room_id } => {
            let service = open_service(&app_config, classifier)?;
            print_json(&service.create_room(&room_id)?)
        }
        Command::JoinRoom { room_id } => {
            let service = open_service(&app_config, classifier)?;
            print_json(&service.join_room(&room_id)?)
        }
        Command::Send {
            room,
            sender,
            content,
        } => {
            let service = open_service(&app_config, classifier)?;
            let request = SendMessageRequest {
                room_id: room,
                sender,
                content,
            };
            print_json(&service.send_message(request).await?)
        }
        Command::Messages {
            room_id,
            page,
            size,
        } => {
            let service = open_service(&app_config, classifier)?;
            print_json(&service.get_messages(&room_id, page, size)?)
        }
    }
}

fn open_service(
    app_config: &AppConfig,
    classifier: HttpSpamClassifier,
) -> Result<ChatService<RoomDatabase, HttpSpamClassifier>, Box<dyn Error>> {
    storage::ensure_data_dir(&app_config.database_path)?;
    let rooms = RoomDatabase::with_path(&app_config.database_path)?;
    log::info!("Opened room database {}", app_config.database_path);
    Ok(ChatService::new(rooms, classifier))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
