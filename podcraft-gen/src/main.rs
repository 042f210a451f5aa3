//! Podcraft generator - command-line entry point
//!
//! Wires the collaborators together once, then runs a single generation
//! request through the dispatcher and prints the result envelope. The HTTP
//! transport in front of this engine lives in a separate service; this
//! binary is the direct-generation surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podcraft_common::{Episode, RequestMetadata};
use podcraft_gen::audio::Pcm;
use podcraft_gen::clients::{HttpBucketStorage, OpenAiScriptModel, OpenAiSpeech};
use podcraft_gen::config::Config;
use podcraft_gen::db::{init::open_database, SqliteEpisodeStore};
use podcraft_gen::feed::{ChannelMeta, FeedBuilder};
use podcraft_gen::pipeline::{
    BriefingPipeline, Collaborators, DialoguePipeline, Dispatcher, PipelineRunner,
    WellnessPipeline,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "podcraft-gen")]
#[command(about = "Generate one podcast episode from a message")]
#[command(version)]
struct Args {
    /// The user message to turn into an episode
    message: String,

    /// User the episode belongs to
    #[arg(short, long, env = "PODCRAFT_USER_ID")]
    user_id: String,

    /// Episode language
    #[arg(short, long, default_value = "en", env = "PODCRAFT_LANG")]
    lang: String,

    /// Intent: briefing, wellness, or other
    #[arg(short, long, default_value = "briefing", env = "PODCRAFT_INTENT")]
    intent: String,

    /// Configuration file
    #[arg(short, long, default_value = "podcraft.toml")]
    config: PathBuf,

    /// SQLite database path (overrides the config file)
    #[arg(long, env = "PODCRAFT_DB")]
    db_path: Option<PathBuf>,
}

/// Stand-in feed builder for the CLI. The hosted deployment replaces this
/// with the feed service client; this emits just enough RSS for players to
/// poll.
struct BareFeed;

impl FeedBuilder for BareFeed {
    fn build(
        &self,
        _user_id: &str,
        episodes: &[Episode],
        channel: &ChannelMeta,
    ) -> podcraft_gen::Result<Vec<u8>> {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<rss version=\"2.0\"><channel>\n");
        xml.push_str(&format!("<title>{}</title>\n", escape(&channel.title)));
        xml.push_str(&format!(
            "<description>{}</description>\n",
            escape(&channel.description)
        ));
        xml.push_str(&format!("<language>{}</language>\n", escape(&channel.language)));
        xml.push_str(&format!("<link>{}</link>\n", escape(&channel.site_url)));
        xml.push_str(&format!("<ttl>{}</ttl>\n", channel.ttl_minutes));
        for episode in episodes {
            xml.push_str("<item>\n");
            xml.push_str(&format!("<title>{}</title>\n", escape(&episode.title)));
            xml.push_str(&format!(
                "<description>{}</description>\n",
                escape(&episode.summary)
            ));
            xml.push_str(&format!(
                "<enclosure url=\"{}\" type=\"audio/mpeg\"/>\n",
                escape(&episode.audio_url)
            ));
            xml.push_str(&format!(
                "<pubDate>{}</pubDate>\n",
                episode.published_at.to_rfc2822()
            ));
            xml.push_str("</item>\n");
        }
        xml.push_str("</channel></rss>\n");
        Ok(xml.into_bytes())
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podcraft_gen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(Some(&args.config)).context("Failed to load configuration")?;

    info!(intent = %args.intent, user = %args.user_id, "starting generation");

    // Collaborators are constructed once and shared by reference
    let model = Arc::new(OpenAiScriptModel::new(&config.model)?);
    let tts = Arc::new(OpenAiSpeech::new(&config.tts)?);
    let storage = Arc::new(HttpBucketStorage::new(&config.storage)?);

    let db_path = args
        .db_path
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(|| PathBuf::from("podcraft.db"));
    let pool = open_database(&db_path)
        .await
        .context("Failed to open episode database")?;
    let store = Arc::new(SqliteEpisodeStore::new(pool));

    let collaborators = Collaborators {
        model,
        tts,
        storage,
        store,
        feed: Arc::new(BareFeed),
    };

    let wellness = match &config.ambient_track {
        Some(path) => {
            let background = WellnessPipeline::load_background(
                path,
                podcraft_gen::audio::MasteringConfig::wellness().sample_rate,
            )
            .context("Failed to load ambient background track")?;
            WellnessPipeline::new(&config.tts, background)
        }
        // No track configured: wellness speech mixes over silence
        None => WellnessPipeline::new(&config.tts, Pcm::new(Vec::new(), 22_050)),
    };

    let runner = PipelineRunner::new(collaborators, config.feed.clone());
    let dispatcher = Dispatcher::new(runner, config.debug)
        .register(Arc::new(BriefingPipeline::new(&config.tts)))
        .register(Arc::new(wellness))
        .register(Arc::new(DialoguePipeline::new(&config.tts)));

    let metadata = RequestMetadata::for_message(&args.message);
    let outcome = dispatcher
        .generate(&args.user_id, &args.message, &args.lang, &args.intent, metadata)
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
