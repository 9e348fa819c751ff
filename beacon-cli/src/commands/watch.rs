use anyhow::Result;
use clap::Args;
use cli::{ConsumerEvent, ConsumerOptions, ConsumerState, NotificationCache, StreamConsumer};

use super::{ConnectionArgs, list::format_row};

#[derive(Args, Debug)]
#[command(about = "Follow notifications in real time, reconnecting when the channel drops")]
pub struct WatchArgs {
    /// Reconnect attempts before giving up (default: `client.reconnect.max_attempts`)
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

fn describe(state: ConsumerState) -> String {
    match state {
        ConsumerState::Connecting => "connecting".to_string(),
        ConsumerState::Connected => "connected".to_string(),
        ConsumerState::Reconnecting { attempt } => format!("reconnecting (attempt {attempt})"),
        ConsumerState::Terminated => "stopped".to_string(),
    }
}

pub async fn handle_watch(connection: &ConnectionArgs, args: WatchArgs) -> Result<()> {
    let mut connection = connection.connect()?;
    if let Some(max_attempts) = args.max_attempts {
        connection.config.reconnect.max_attempts = max_attempts;
    }

    println!(
        "Watching notifications on {} (press Ctrl+C to stop)",
        connection.config.server_url
    );

    let cache = NotificationCache::shared(connection.config.cache_capacity);
    let options = ConsumerOptions::from(&connection.config);
    let mut handle = StreamConsumer::spawn(connection.api, cache, options);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                handle.close();
                break;
            }
            event = handle.next_event() => match event {
                Some(ConsumerEvent::StateChanged(state)) => eprintln!("[stream] {}", describe(state)),
                Some(ConsumerEvent::Snapshot { unread_count, .. } | ConsumerEvent::UnreadCount(unread_count)) => {
                    println!("{unread_count} unread");
                }
                Some(ConsumerEvent::Arrived(rows)) => {
                    for row in &rows {
                        println!("{}", format_row(row));
                    }
                }
                Some(ConsumerEvent::ConnectionLost { attempts }) => {
                    eprintln!("[stream] real-time updates unavailable after {attempts} attempts");
                }
                None => break,
            },
        }
    }

    handle.join().await?;
    Ok(())
}
