use crate::types::Coords;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_STORE: &str = "mapty.sqlite";
const DEFAULT_SESSION: &str = "default";

#[derive(Parser, Debug)]
#[command(
    name = "mapty",
    about = "Log running and cycling workouts at map locations, kept per session"
)]
pub struct Cli {
    /// SQLite file holding the stored sessions.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_STORE, global = true)]
    pub store: PathBuf,

    /// Session (tab) name; each session keeps its own workouts.
    #[arg(long, default_value = DEFAULT_SESSION, global = true)]
    pub session: String,

    /// Device position as LAT,LNG. Without it the map cannot load.
    #[arg(long, value_name = "LAT,LNG", global = true, allow_hyphen_values = true)]
    pub here: Option<Coords>,

    /// Accept cycling workouts with zero elevation gain.
    #[arg(long, global = true)]
    pub allow_flat: bool,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Click the map at a location and submit the workout form.
    Add {
        /// Where the map was clicked, LAT,LNG.
        #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true)]
        at: Coords,

        /// Workout type; anything but running/cycling is rejected.
        #[arg(long, default_value = "running")]
        kind: String,

        /// Distance in km.
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        distance: String,

        /// Duration in minutes.
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        duration: String,

        /// Cadence in steps per minute (running).
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        cadence: String,

        /// Elevation gain in meters (cycling).
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        elevation: String,
    },

    /// Print the workout list, newest first.
    List {
        /// Include id, time of day and selection count.
        #[arg(long)]
        details: bool,

        /// Print the HTML list items instead of text lines.
        #[arg(long, conflicts_with = "details")]
        html: bool,
    },

    /// Select a workout in the list and move the map to it.
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Print the map: view, tile layer, markers and popups.
    Map,

    /// Clear the stored session.
    Reset,
}
