use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, Subcommand};
use log::{debug, error};
use astrax::auth::{SessionService, SupabaseSession};
use astrax::chat::{ChatLog, FALLBACK_REPLY};
use astrax::config::AstraConfig;
use astrax::presets::{available_models, Persona};
use astrax::tracker::{RequestDefaults, RequestTracker};
use astrax::Error;

#[derive(Parser)]
#[command(name = "astrax", about = "ASTRA-X mission assistant")]
struct Cli
{   /// JSON config file
    #[arg(short, long, env = "ASTRAX_CONFIG")]
    config: Option<String>

  , /// Call the provider directly instead of the proxy function
    #[arg(long)]
    direct: bool

  , #[command(subcommand)]
    command: Command
}

#[derive(Subcommand)]
enum Command
{   /// Send one prompt and print the reply
    Ask
    {   prompt: Vec<String>
      , #[arg(long)]
        context: Option<String>
      , #[arg(long)]
        persona: Option<String>
      , #[arg(long)]
        model: Option<String>
      , /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>
    }
  , /// Interactive mission chat on stdin
    Chat
    {   #[arg(long, default_value = "Mission control operations")]
        context: String
    }
  , /// List selectable models
    Models
  , /// Show the signed-in user
    Whoami
    {   #[arg(long, env = "ASTRAX_ACCESS_TOKEN")]
        token: String
    }
  , /// Invalidate the current session
    SignOut
    {   #[arg(long, env = "ASTRAX_ACCESS_TOKEN")]
        token: String
    }
}

#[tokio::main]
async fn main()
{   env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await
    {   error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&str>) -> Result<AstraConfig, Error>
{   let config = match path
    {   Some(p) => AstraConfig::load(p)?
      , None => AstraConfig::default()
    }.apply_env();
    config.validate()?;
    Ok(config)
}

fn parse_persona(id: Option<&str>, fallback: Persona) -> Result<Persona, Error>
{   match id
    {   None => Ok(fallback)
      , Some(id) => Persona::from_id(id).ok_or_else(|| {
          Error::Configuration(format!("unknown persona: {}", id))
        })
    }
}

fn build_tracker(config: &AstraConfig, direct: bool)
  -> Result<Arc<RequestTracker>, Error>
{   let transport = astrax::providers::from_config(config, direct)?;
    Ok(Arc::new(RequestTracker::new(
      transport,
      RequestDefaults::from(&config.transport)
    )))
}

async fn run(cli: Cli) -> Result<(), Error>
{   let config = load_config(cli.config.as_deref())?;
    debug!("Config: {:?}", config);

    match cli.command
    {   Command::Ask { prompt, context, persona, model, timeout } => {
          let persona = parse_persona(persona.as_deref(), config.persona)?;
          let tracker = build_tracker(&config, cli.direct)?;
          let prompt = prompt.join(" ");
          let call = tracker.generate(
            &prompt, context.as_deref(), persona, model.as_deref()
          );
          let result = match timeout
          {   Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
                .await
                .unwrap_or(Err(Error::Timeout))
            , None => call.await
          };
          match result
          {   Ok(text) => {
                println!("{}", text);
                if let Some(usage) = tracker.state().last_usage
                {   eprintln!("[{} tokens, {}]", usage.tokens, usage.model);
                }
                Ok(())
              }
            , Err(e) => {
                println!("{}", FALLBACK_REPLY);
                Err(e)
              }
          }
        }
      , Command::Chat { context } => {
          let tracker = build_tracker(&config, cli.direct)?;
          let mut log = ChatLog::new(tracker, config.persona, context);
          println!("{}", log.entries()[0].content);
          let stdin = std::io::stdin();
          let mut lines = stdin.lock().lines();
          loop
          {   print!("> ");
              let _ = std::io::stdout().flush();
              let Some(Ok(line)) = lines.next() else
              {   break;
              };
              if let Some(entry) = log.submit(&line).await
              {   match entry.tokens
                  {   Some(t) => println!("{}  [{} tokens]", entry.content, t)
                    , None => println!("{}", entry.content)
                  }
              }
          }
          Ok(())
        }
      , Command::Models => {
          for model in available_models()
          {   println!(
                "{:<40} {:<14} {:>7} ctx  {}",
                model.id, model.name, model.context_length, model.description
              );
          }
          Ok(())
        }
      , Command::Whoami { token } => {
          let session = SupabaseSession::from_config(&config.auth, Some(token))?;
          match session.current_session().await?
          {   Some(user) => println!(
                "{} {}",
                user.id,
                user.email.as_deref().unwrap_or("")
              )
            , None => println!("not signed in")
          }
          Ok(())
        }
      , Command::SignOut { token } => {
          let session = SupabaseSession::from_config(&config.auth, Some(token))?;
          session.sign_out().await?;
          println!("signed out");
          Ok(())
        }
    }
}
