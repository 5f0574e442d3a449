use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "luca3-cli")]
#[command(about = "Command-line client for the Luca3Auth service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key, for admin commands.
    #[arg(short, long, env = "LUCA3_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a student's profile
    Student { card_uid: String },
    /// Register a student for a card
    Register {
        card_uid: String,
        #[arg(long)]
        student_id: String,
        /// Profile picture file
        #[arg(long)]
        image: PathBuf,
        /// Name label to claim (defaults to the display id)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show registration progress
    Progress { session_id: String },
    /// Claim a certification for a student
    Claim { card_uid: String, certification_id: String },
    /// Show treasury balances
    Treasury { card_uid: String },
    /// Swap ETH for USDC in a student's treasury
    Swap { card_uid: String, amount: String },
    /// Send funds from a student's treasury
    Send {
        card_uid: String,
        recipient: String,
        amount: String,
        #[arg(long, default_value = "usdc")]
        token: String,
    },
    /// Show an action's status
    Action { action_id: String },
    /// Withdraw USDC from the treasury (admin)
    Withdraw { amount: String },
    /// Look up a name such as alice.luca.eth
    Resolve { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();
    let url = |path: String| format!("{}{}", base, path);

    let request: RequestBuilder = match cli.command {
        Commands::Student { card_uid } => client.get(url(format!("/api/students/{}", card_uid))),
        Commands::Register {
            card_uid,
            student_id,
            image,
            name,
        } => {
            let bytes = tokio::fs::read(&image).await?;
            let file_name = image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("image")
                .to_string();
            let mut form = Form::new()
                .text("student_id", student_id)
                .part("image", Part::bytes(bytes).file_name(file_name));
            if let Some(name) = name {
                form = form.text("name", name);
            }
            client
                .post(url(format!("/api/students/{}/register", card_uid)))
                .multipart(form)
        }
        Commands::Progress { session_id } => {
            client.get(url(format!("/api/registrations/{}", session_id)))
        }
        Commands::Claim {
            card_uid,
            certification_id,
        } => client
            .post(url(format!("/api/students/{}/certifications/claim", card_uid)))
            .json(&json!({ "certification_id": certification_id })),
        Commands::Treasury { card_uid } => {
            client.get(url(format!("/api/students/{}/treasury", card_uid)))
        }
        Commands::Swap { card_uid, amount } => client
            .post(url(format!("/api/students/{}/treasury/swap", card_uid)))
            .json(&json!({ "amount": amount })),
        Commands::Send {
            card_uid,
            recipient,
            amount,
            token,
        } => client
            .post(url(format!("/api/students/{}/treasury/send", card_uid)))
            .json(&json!({ "recipient": recipient, "amount": amount, "token": token })),
        Commands::Action { action_id } => client.get(url(format!("/api/actions/{}", action_id))),
        Commands::Withdraw { amount } => client
            .post(url("/admin/withdraw".to_string()))
            .bearer_auth(&cli.key)
            .json(&json!({ "amount": amount })),
        Commands::Resolve { name } => {
            let (label, domain) = name.split_once('.').unwrap_or((name.as_str(), ""));
            let mut query = vec![("name", label.to_string())];
            if !domain.is_empty() {
                query.push(("domain", domain.to_string()));
            }
            client.get(url("/api/names/search".to_string())).query(&query)
        }
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };
    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: service returned status {}", status);
        eprintln!("{}", body);
    }
    Ok(())
}
