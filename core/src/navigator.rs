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

use log::{info, warn};
use url::Url;

/// Sends the user to a URL. For a CLI that means the system browser.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

/// Opens URLs in the default browser, printing them when that fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &Url) {
        match webbrowser::open(url.as_str()) {
            Ok(()) => {
                info!("Opened authorization page in the browser");
                println!("Opened {} in your browser.", url);
            }
            Err(e) => {
                warn!("Could not open browser: {}", e);
                println!("Please open this URL in your browser:");
                println!("{}", url);
            }
        }
    }
}

/// Only prints the URL. Used for headless sessions (`--no-browser`).
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, url: &Url) {
        println!("Please open this URL in your browser:");
        println!("{}", url);
    }
}
