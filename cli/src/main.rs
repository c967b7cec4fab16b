/*
    spotify-discover | Rust CLI to explore your Spotify profile, library and recommendations.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use discover_core::{
    ApiClient, ApiError, AuthConfig, BrowserNavigator, FileStore, Navigator, PrintNavigator, Seed,
    SessionManager, SessionState, Track,
};
use dotenvy::dotenv;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "spotify-discover")]
#[command(about = "Explore your Spotify profile, library and recommendations", long_about = None)]
struct Cli {
    /// Print the authorization URL instead of opening a browser
    #[arg(long, global = true)]
    no_browser: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Opens the Spotify login page, then asks for the URL you were redirected to
    Login,
    /// Completes a pending login with the URL Spotify redirected to
    Callback {
        /// The full redirected URL, including `code` and `state`
        #[arg(value_name = "REDIRECTED_URL")]
        url: String,
    },
    /// Shows whether you are logged in and until when
    Status,
    /// Shows your Spotify profile
    Profile {
        /// Output the result to a JSON file (e.g., --json=profile.json)
        #[arg(long)]
        json: Option<String>,
    },
    /// Searches tracks
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        json: Option<String>,
    },
    /// Lists your playlists with their IDs
    Playlists {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long)]
        json: Option<String>,
    },
    /// Lists the tracks of a playlist
    Playlist {
        /// The Spotify ID or URI of the playlist
        #[arg(value_name = "PLAYLIST_ID")]
        playlist_id: String,
        #[arg(long, default_value_t = 100)]
        limit: u32,
        #[arg(long)]
        json: Option<String>,
    },
    /// Lists your most played tracks
    TopTracks {
        /// short_term, medium_term or long_term
        #[arg(long, default_value = "long_term")]
        time_range: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        json: Option<String>,
    },
    /// Lists your most played artists
    TopArtists {
        /// short_term, medium_term or long_term
        #[arg(long, default_value = "long_term")]
        time_range: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        json: Option<String>,
    },
    /// Lists the genres available as recommendation seeds
    Genres {
        #[arg(long)]
        json: Option<String>,
    },
    /// Lists your 'Liked Songs'
    Liked {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long)]
        json: Option<String>,
    },
    /// Recommends tracks similar to a track or an artist
    Recommend {
        /// Seed track ID or URI
        #[arg(long, required_unless_present = "artist", conflicts_with = "artist")]
        track: Option<String>,
        /// Seed artist ID or URI
        #[arg(long)]
        artist: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        json: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if dotenv().is_err() {
        // Silently ignore
    }

    let cli = Cli::parse();
    let session = Arc::new(build_session(cli.no_browser));

    match &cli.command {
        Commands::Login => handle_login(&session).await,
        Commands::Callback { url } => handle_callback(&session, url).await,
        Commands::Status => handle_status(&session),
        Commands::Profile { json } => handle_profile(session, json.as_deref()).await,
        Commands::Search { query, limit, json } => {
            handle_search(session, query, *limit, json.as_deref()).await
        }
        Commands::Playlists { limit, json } => {
            handle_playlists(session, *limit, json.as_deref()).await
        }
        Commands::Playlist {
            playlist_id,
            limit,
            json,
        } => handle_playlist(session, playlist_id, *limit, json.as_deref()).await,
        Commands::TopTracks {
            time_range,
            limit,
            json,
        } => handle_top_tracks(session, time_range, *limit, json.as_deref()).await,
        Commands::TopArtists {
            time_range,
            limit,
            json,
        } => handle_top_artists(session, time_range, *limit, json.as_deref()).await,
        Commands::Genres { json } => handle_genres(session, json.as_deref()).await,
        Commands::Liked { limit, json } => handle_liked(session, *limit, json.as_deref()).await,
        Commands::Recommend {
            track,
            artist,
            limit,
            json,
        } => {
            let seed = match (track, artist) {
                (Some(id), _) => Seed::Track(id.clone()),
                (None, Some(id)) => Seed::Artist(id.clone()),
                (None, None) => {
                    eprintln!("Pass --track or --artist.");
                    process::exit(1);
                }
            };
            handle_recommend(session, &seed, *limit, json.as_deref()).await
        }
    }
}

fn build_session(no_browser: bool) -> SessionManager {
    let config = match AuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("Set RSPOTIFY_CLIENT_ID and RSPOTIFY_REDIRECT_URI (a .env file works too).");
            process::exit(1);
        }
    };

    let store = Arc::new(FileStore::new(config.session_path.clone()));
    let navigator: Arc<dyn Navigator> = if no_browser {
        Arc::new(PrintNavigator)
    } else {
        Arc::new(BrowserNavigator)
    };

    SessionManager::new(config, store, navigator)
}

async fn handle_login(session: &SessionManager) {
    if let Err(e) = session.begin_login() {
        eprintln!("[ERROR] Could not start login: {}", e);
        process::exit(1);
    }

    println!();
    println!(
        "After approving access you will be redirected to {}",
        session.config().redirect_uri
    );
    println!("Paste the full URL you were redirected to:");

    let redirected = match read_line() {
        Ok(line) => line,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            process::exit(1);
        }
    };

    handle_callback(session, &redirected).await;
}

async fn handle_callback(session: &SessionManager, url: &str) {
    match session.complete_from_redirect(url).await {
        Ok(_) => {
            println!();
            println!("[OK] Logged in.");
            print_session(session);
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Login failed: {}", e);
            eprintln!("Run 'spotify-discover login' to start over.");
            process::exit(1);
        }
    }
}

fn handle_status(session: &SessionManager) {
    match session.state() {
        SessionState::Authenticated => {
            println!("Logged in.");
            print_session(session);
        }
        SessionState::AwaitingCallback => {
            println!("Login started but not completed.");
            println!("Run 'spotify-discover callback <URL>' with the URL Spotify redirected you to.");
        }
        SessionState::LoggedOut => {
            println!("Not logged in (or the session expired).");
            println!("Run 'spotify-discover login'.");
        }
    }
}

fn print_session(session: &SessionManager) {
    if let Ok(Some(current)) = session.session() {
        println!(
            "Token valid until: {}",
            current.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("Session file:      {}", session.config().session_path.display());
}

async fn handle_profile(session: Arc<SessionManager>, json_path: Option<&str>) {
    let client = ApiClient::new(session);
    println!("Fetching your profile...");

    let profile = client.profile().await.unwrap_or_else(|e| exit_on_api_error(e));

    println!();
    println!("PROFILE");
    println!("---------------------------------------------------");
    println!("Name:       {}", profile.name);
    println!("ID:         {}", profile.id);
    println!("Email:      {}", profile.email.as_deref().unwrap_or("-"));
    println!("Country:    {}", profile.country.as_deref().unwrap_or("-"));
    println!("Product:    {}", profile.product.as_deref().unwrap_or("-"));
    println!("Followers:  {}", profile.followers);
    println!("URI:        {}", profile.uri);
    println!("---------------------------------------------------");

    save_report(json_path, &profile);
}

async fn handle_search(
    session: Arc<SessionManager>,
    query: &str,
    limit: u32,
    json_path: Option<&str>,
) {
    let client = ApiClient::new(session);
    println!("Searching tracks for '{}' ...", query);

    let tracks = client
        .search_tracks(query, limit)
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    print_tracks(&tracks);
    save_report(json_path, &tracks);
}

async fn handle_playlists(session: Arc<SessionManager>, limit: u32, json_path: Option<&str>) {
    let client = ApiClient::new(session);
    println!("Fetching your playlists...");

    let page = client
        .playlists(limit)
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    // Header
    println!();
    println!(
        "{:<25} | {:<30} | {:<20} | {:<6} | {:<5}",
        "ID", "Name", "Owner", "Tracks", "Collab"
    );
    println!(
        "{:-<25}-+-{:-<30}-+-{:-<20}-+-{:-<6}-+-{:-<5}",
        "", "", "", "", ""
    );

    for pl in &page.items {
        let collab = if pl.is_collaborative { "Yes" } else { "No" };
        println!(
            "{:<25} | {:<30} | {:<20} | {:<6} | {:<5}",
            pl.id,
            truncate(&pl.name, 28),
            truncate(&pl.owner_name, 18),
            pl.total_tracks,
            collab
        );
    }
    println!();
    println!("Showing {} of {} playlists.", page.items.len(), page.total);
    println!("Tip: Copy an ID and run 'spotify-discover playlist <ID>'");

    save_report(json_path, &page);
}

async fn handle_playlist(
    session: Arc<SessionManager>,
    playlist_id: &str,
    limit: u32,
    json_path: Option<&str>,
) {
    let client = ApiClient::new(session);
    println!("Fetching tracks of Playlist ID: {} ...", playlist_id);

    let page = client
        .playlist_tracks(playlist_id, limit)
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    print_tracks(&page.items);
    println!();
    println!("Showing {} of {} tracks.", page.items.len(), page.total);

    save_report(json_path, &page);
}

async fn handle_top_tracks(
    session: Arc<SessionManager>,
    time_range: &str,
    limit: u32,
    json_path: Option<&str>,
) {
    let client = ApiClient::new(session);
    println!("Fetching your top tracks ({}) ...", time_range);

    let tracks = client
        .top_tracks(time_range, limit)
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    print_tracks(&tracks);
    save_report(json_path, &tracks);
}

async fn handle_top_artists(
    session: Arc<SessionManager>,
    time_range: &str,
    limit: u32,
    json_path: Option<&str>,
) {
    let client = ApiClient::new(session);
    println!("Fetching your top artists ({}) ...", time_range);

    let artists = client
        .top_artists(time_range, limit)
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    println!();
    for (i, artist) in artists.iter().enumerate() {
        println!("{}. {}", i + 1, artist);
    }

    save_report(json_path, &artists);
}

async fn handle_genres(session: Arc<SessionManager>, json_path: Option<&str>) {
    let client = ApiClient::new(session);
    println!("Fetching available genres...");

    let genres = client
        .genre_seeds()
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    println!();
    for genre in &genres {
        println!("   - {}", genre);
    }
    println!();
    println!("{} genres.", genres.len());

    save_report(json_path, &genres);
}

async fn handle_liked(session: Arc<SessionManager>, limit: u32, json_path: Option<&str>) {
    let client = ApiClient::new(session);
    println!("Fetching your Liked Songs...");

    let page = client
        .liked_songs(limit)
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    print_tracks(&page.items);
    println!();
    println!("Showing {} of {} liked songs.", page.items.len(), page.total);

    save_report(json_path, &page);
}

async fn handle_recommend(
    session: Arc<SessionManager>,
    seed: &Seed,
    limit: u32,
    json_path: Option<&str>,
) {
    let client = ApiClient::new(session);
    match seed {
        Seed::Track(id) => println!("Finding tracks similar to track {} ...", id),
        Seed::Artist(id) => println!("Finding tracks similar to artist {} ...", id),
    }

    let tracks = client
        .recommendations(seed, limit)
        .await
        .unwrap_or_else(|e| exit_on_api_error(e));

    print_tracks(&tracks);
    save_report(json_path, &tracks);
}

fn print_tracks(tracks: &[Track]) {
    println!();
    if tracks.is_empty() {
        println!("No tracks found.");
        return;
    }
    for (i, track) in tracks.iter().enumerate() {
        println!("{}. {}", i + 1, track);
    }
}

fn exit_on_api_error(e: ApiError) -> ! {
    eprintln!();
    if e.needs_reauth() {
        eprintln!("[AUTH] Your session is missing or expired, so a new login was started.");
        eprintln!("Finish it with 'spotify-discover callback <URL>' and run the command again.");
        process::exit(2);
    }
    eprintln!("[ERROR] Request failed: {}", e);
    process::exit(1);
}

fn save_report<T: Serialize>(json_path: Option<&str>, value: &T) {
    let Some(path) = json_path else {
        return;
    };

    match write_json(path, value) {
        Ok(()) => {
            println!();
            println!("[SAVED] Report saved to: {}", path);
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Failed to write report: {:#}", e);
        }
    }
}

fn write_json<T: Serialize>(path: &str, value: &T) -> anyhow::Result<()> {
    let json_content = serde_json::to_string_pretty(value).context("serializing report")?;
    let mut file = File::create(path).with_context(|| format!("creating '{}'", path))?;
    file.write_all(json_content.as_bytes())
        .with_context(|| format!("writing '{}'", path))?;
    Ok(())
}

fn read_line() -> anyhow::Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading the redirected URL from stdin")?;
    Ok(line.trim().to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}..", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
