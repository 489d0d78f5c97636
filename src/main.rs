#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::Parser;
use mapty::app::{App, AppConfig, ListTarget, SubmitOutcome};
use mapty::form::ElevationPolicy;
use mapty::map::SceneMap;
use mapty::storage::SqliteSessionStore;
use mapty::types::WorkoutId;
use mapty::{cli, render, utils};

#[macro_use]
extern crate mapty;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let store = SqliteSessionStore::open(&cli.store, &cli.session)?;
    dlog!(
        "store={} session={} here={:?}",
        cli.store.display(),
        cli.session,
        cli.here
    );

    let config = AppConfig {
        elevation_policy: if cli.allow_flat {
            ElevationPolicy::AllowFlat
        } else {
            ElevationPolicy::NonZero
        },
        ..AppConfig::default()
    };
    let mut app = App::new(config, SceneMap::new(), store);

    // Reset works without a device position.
    if !matches!(cli.cmd, cli::Cmd::Reset) {
        app.initialize(&cli.here)
            .context("The map needs a device position; pass --here LAT,LNG")?;
    }

    match cli.cmd {
        cli::Cmd::Add {
            at,
            kind,
            distance,
            duration,
            cadence,
            elevation,
        } => {
            app.handle_map_click(at);
            if kind != app.form().kind {
                app.select_kind(&kind);
            }
            let form = app.form_mut();
            form.distance = distance;
            form.duration = duration;
            form.cadence = cadence;
            form.elevation = elevation;

            match app.submit()? {
                SubmitOutcome::Created(id) => {
                    if let Some(entry) = app.entries().first() {
                        println!("{id}\t{}", entry.to_line());
                    }
                }
                SubmitOutcome::Rejected(reason) => {
                    anyhow::bail!("workout not recorded: {reason}");
                }
            }
        }
        cli::Cmd::List { details, html } => {
            let tz = app.config().utc_offset;
            for entry in app.entries() {
                if html {
                    print!("{}", entry.to_html());
                } else if details {
                    let Some(w) = app.workouts().iter().find(|w| *w.id() == entry.id) else {
                        continue;
                    };
                    println!(
                        "{}\t{}\t{}\t{}\tclicks={}\t{}",
                        entry.id,
                        render::clock_time(w, &tz),
                        w.coords(),
                        utils::format_minutes(w.duration_min()),
                        w.clicks(),
                        entry.to_line()
                    );
                } else {
                    println!("{}", entry.to_line());
                }
            }
        }
        cli::Cmd::Show { id } => {
            let id = WorkoutId::from(id.as_str());
            if !app.handle_list_click(&ListTarget::Entry(id.clone()))? {
                anyhow::bail!("no workout with id {id}");
            }
            if let Some(center) = app.map().center() {
                println!("map centered on {center} zoom {}", app.map().zoom());
            }
        }
        cli::Cmd::Map => {
            let map = app.map();
            if let Some(center) = map.center() {
                println!("view\t{center}\tzoom {}", map.zoom());
            }
            for layer in map.tile_layers() {
                println!("tiles\t{layer}");
            }
            for m in map.markers() {
                let state = if m.open { "open" } else { "closed" };
                println!("marker\t{}\t{}\t{state}\t{}", m.at, m.popup.class_name, m.content);
            }
        }
        cli::Cmd::Reset => {
            app.reset()?;
            println!("session {:?} cleared", cli.session);
        }
    }

    Ok(())
}
