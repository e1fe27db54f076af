use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{debug, info, warn};

use crate::config::{Config, FeedChannel, FeedErrorPolicy};
use crate::export;
use crate::youtube::SearchClient;

/// Print the end-of-run summary, keeping stdout clean when the output went there
fn summary(msg: &str, output: &Path) {
    if output == Path::new("-") {
        eprintln!("{}", msg);
    } else {
        println!("{}", msg);
    }
}

fn path_arg(sub_m: &ArgMatches, name: &str, default: &Path) -> PathBuf {
    sub_m
        .value_of(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| default.to_path_buf())
}

/// Resolve configured artist names and write the channels file
fn resolve(cfg: &Config, output: &Path, with_subscribers: bool) -> Result<()> {
    if cfg.artists.is_empty() {
        warn!("No artists configured");
    }

    let client = SearchClient::new(&cfg.search_base, cfg.api_key());
    let report = client.resolve(&cfg.artists)?;

    let subscribers = if with_subscribers {
        let ids: Vec<&str> = report.resolved().map(|(_, id)| id).collect();
        if ids.is_empty() {
            Default::default()
        } else {
            client.fetch_subscribers(&ids)?
        }
    } else {
        Default::default()
    };

    for (name, id) in report.resolved() {
        info!("{} -> {}", name, id);
    }

    let records = report.to_records(&subscribers);
    export::save_channels(&records, output)?;
    summary(&report.summary(), output);
    summary(&format!("Channels saved to {}", output.display()), output);
    Ok(())
}

/// Channel summary items from the channels file
fn normalize(channels: &Path, output: &Path) -> Result<()> {
    let records = export::load_channels(channels)
        .with_context(|| format!("Invalid channels file {}", channels.display()))?;
    let items = crate::normalize::normalize(&records);
    export::export(&items, output)?;
    summary(&format!("Wrote {} items to {}", items.len(), output.display()), output);
    Ok(())
}

/// Video items from the configured feeds, falling back to the channels file
fn videos(cfg: &Config, channels: &Path, output: &Path, policy: FeedErrorPolicy) -> Result<()> {
    let mut feeds = cfg.feed_channels()?;
    if feeds.is_empty() {
        debug!("No feeds configured, using channels from {}", channels.display());
        let records = export::load_channels(channels)
            .with_context(|| format!("Invalid channels file {}", channels.display()))?;
        feeds = records
            .iter()
            .map(|r| FeedChannel::from_record(r, &cfg.feed_base))
            .collect();
    }

    let items = crate::feed::collect_videos(&feeds, policy)?;
    export::export(&items, output)?;
    summary(
        &format!("Wrote {} videos from {} channels to {}", items.len(), feeds.len(), output.display()),
        output,
    );
    Ok(())
}

/// View count snapshots for the video items in `input`
fn views(cfg: &Config, input: &Path, output: &Path) -> Result<()> {
    let videos = export::load_items(input)?;
    let ids: Vec<&str> = videos
        .iter()
        .filter(|i| i.channel.is_some())
        .map(|i| i.external_id.as_str())
        .collect();
    if ids.is_empty() {
        warn!("No video items in {}", input.display());
    }

    let items = crate::views::collect_views(&cfg.watch_base, &ids, &chrono::Utc::now())?;
    export::export(&items, output)?;
    summary(
        &format!("Wrote {} view snapshots for {} videos to {}", items.len(), ids.len(), output.display()),
        output,
    );
    Ok(())
}

/// Send an exported items file to the ingestion engine
fn push(cfg: &Config, input: &Path) -> Result<()> {
    let engine = cfg
        .engine
        .as_ref()
        .context("No [engine] section in config")?;
    let token = engine
        .token()
        .with_context(|| format!("Environment variable {} not set", &engine.token_env))?;

    let items = export::load_items(input)?;
    let sent = crate::push::push(&items, &engine.url, &token)?;
    println!("Pushed {} items to {}", sent, &engine.url);
    Ok(())
}

fn config_logging(verbosity: u64) -> Result<()> {
    // Level for this application
    let internal_level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,  // -v
        2 => log::LevelFilter::Debug, // -vv
        _ => log::LevelFilter::Trace, // -vvv
    };

    // Show log output for 3rd party library at -vvv
    let thirdparty_level = match verbosity {
        0..=2 => log::LevelFilter::Warn,
        _ => log::LevelFilter::Debug, // -vvv
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(thirdparty_level)
        .level_for("chanpull", internal_level)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}

fn channels_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("channels")
        .short("i")
        .long("channels")
        .takes_value(true)
        .help("channels file (defaults to `channels_file` from config)")
}

fn output_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("output")
        .short("o")
        .long("output")
        .takes_value(true)
        .help("output path, or - for stdout")
}

pub fn main() -> Result<()> {
    let sc_resolve = SubCommand::with_name("resolve")
        .about("look up channel IDs for the configured artists and write the channels file")
        .arg(output_arg())
        .arg(
            Arg::with_name("skip-subscribers")
                .long("skip-subscribers")
                .help("don't look up subscriber counts (written as 0)"),
        );

    let sc_normalize = SubCommand::with_name("normalize")
        .about("write channel summary items from the channels file")
        .arg(channels_arg())
        .arg(output_arg());

    let sc_videos = SubCommand::with_name("videos")
        .about("poll channel feeds and write video items")
        .arg(channels_arg())
        .arg(output_arg())
        .arg(
            Arg::with_name("skip-failed-feeds")
                .long("skip-failed-feeds")
                .help("leave out channels whose feed can't be fetched or parsed, instead of stopping"),
        );

    let sc_views = SubCommand::with_name("views")
        .about("snapshot view counts for the videos in a video items file")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .help("video items file (defaults to `videos_file` from config)"),
        )
        .arg(output_arg());

    let sc_push = SubCommand::with_name("push")
        .about("send an items file to the ingestion engine")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true),
        );

    // Main command
    let app = App::new("chanpull")
        .subcommand(sc_resolve)
        .subcommand(sc_normalize)
        .subcommand(sc_videos)
        .subcommand(sc_views)
        .subcommand(sc_push)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .takes_value(false)
                .global(true),
        );

    // Parse
    let app_m = app.get_matches();

    // Logging levels
    let verbosity = app_m.occurrences_of("verbose");
    config_logging(verbosity)?;

    let cfg = Config::load(app_m.value_of("config").map(Path::new))?;
    debug!("Config: {:?}", &cfg);

    match app_m.subcommand() {
        ("resolve", Some(sub_m)) => resolve(
            &cfg,
            &path_arg(sub_m, "output", &cfg.channels_file),
            !sub_m.is_present("skip-subscribers"),
        )?,
        ("normalize", Some(sub_m)) => normalize(
            &path_arg(sub_m, "channels", &cfg.channels_file),
            &path_arg(sub_m, "output", &cfg.items_file),
        )?,
        ("videos", Some(sub_m)) => {
            let policy = if sub_m.is_present("skip-failed-feeds") {
                FeedErrorPolicy::Skip
            } else {
                cfg.on_feed_error
            };
            videos(
                &cfg,
                &path_arg(sub_m, "channels", &cfg.channels_file),
                &path_arg(sub_m, "output", &cfg.videos_file),
                policy,
            )?
        }
        ("views", Some(sub_m)) => views(
            &cfg,
            &path_arg(sub_m, "input", &cfg.videos_file),
            &path_arg(sub_m, "output", &cfg.views_file),
        )?,
        ("push", Some(sub_m)) => push(&cfg, &path_arg(sub_m, "input", &cfg.items_file))?,
        _ => {
            return Err(anyhow::anyhow!("Unhandled subcommand"));
        }
    };

    Ok(())
}
