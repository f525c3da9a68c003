//! NBA team directory.
//!
//! Resolves whatever the user typed ("lakers", "LAL", "dubs") to the official
//! franchise name, and carries the per-franchise ids the providers need.

use serde::Serialize;

/// One NBA franchise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Team {
    pub name: &'static str,
    pub abbreviation: &'static str,
    /// stats.nba.com team id
    pub nba_id: u32,
    pub subreddit: &'static str,
    /// Lowercase nicknames and short forms besides name and abbreviation
    pub aliases: &'static [&'static str],
}

const TEAMS: &[Team] = &[
    Team { name: "Atlanta Hawks", abbreviation: "ATL", nba_id: 1610612737, subreddit: "atlantahawks", aliases: &["hawks", "atlanta"] },
    Team { name: "Boston Celtics", abbreviation: "BOS", nba_id: 1610612738, subreddit: "bostonceltics", aliases: &["celtics", "boston", "cs"] },
    Team { name: "Cleveland Cavaliers", abbreviation: "CLE", nba_id: 1610612739, subreddit: "clevelandcavs", aliases: &["cavaliers", "cavs", "cleveland", "cleveland cavs"] },
    Team { name: "New Orleans Pelicans", abbreviation: "NOP", nba_id: 1610612740, subreddit: "nolapelicans", aliases: &["pelicans", "pels", "new orleans"] },
    Team { name: "Chicago Bulls", abbreviation: "CHI", nba_id: 1610612741, subreddit: "chicagobulls", aliases: &["bulls", "chicago"] },
    Team { name: "Dallas Mavericks", abbreviation: "DAL", nba_id: 1610612742, subreddit: "mavericks", aliases: &["mavericks", "mavs", "dallas"] },
    Team { name: "Denver Nuggets", abbreviation: "DEN", nba_id: 1610612743, subreddit: "denvernuggets", aliases: &["nuggets", "denver"] },
    Team { name: "Golden State Warriors", abbreviation: "GSW", nba_id: 1610612744, subreddit: "warriors", aliases: &["warriors", "golden state", "gs", "dubs"] },
    Team { name: "Houston Rockets", abbreviation: "HOU", nba_id: 1610612745, subreddit: "rockets", aliases: &["rockets", "houston"] },
    Team { name: "Los Angeles Clippers", abbreviation: "LAC", nba_id: 1610612746, subreddit: "laclippers", aliases: &["clippers", "la clippers", "clips"] },
    Team { name: "Los Angeles Lakers", abbreviation: "LAL", nba_id: 1610612747, subreddit: "lakers", aliases: &["lakers", "la lakers"] },
    Team { name: "Miami Heat", abbreviation: "MIA", nba_id: 1610612748, subreddit: "heat", aliases: &["heat", "miami"] },
    Team { name: "Milwaukee Bucks", abbreviation: "MIL", nba_id: 1610612749, subreddit: "milwaukeebucks", aliases: &["bucks", "milwaukee"] },
    Team { name: "Minnesota Timberwolves", abbreviation: "MIN", nba_id: 1610612750, subreddit: "timberwolves", aliases: &["timberwolves", "wolves", "minnesota"] },
    Team { name: "Brooklyn Nets", abbreviation: "BKN", nba_id: 1610612751, subreddit: "gonets", aliases: &["nets", "brooklyn", "bkn nets"] },
    Team { name: "New York Knicks", abbreviation: "NYK", nba_id: 1610612752, subreddit: "nyknicks", aliases: &["knicks", "ny knicks", "new york"] },
    Team { name: "Orlando Magic", abbreviation: "ORL", nba_id: 1610612753, subreddit: "orlandomagic", aliases: &["magic", "orlando"] },
    Team { name: "Indiana Pacers", abbreviation: "IND", nba_id: 1610612754, subreddit: "pacers", aliases: &["pacers", "indiana"] },
    Team { name: "Philadelphia 76ers", abbreviation: "PHI", nba_id: 1610612755, subreddit: "sixers", aliases: &["76ers", "sixers", "philadelphia", "philadelphia sixers", "philly"] },
    Team { name: "Phoenix Suns", abbreviation: "PHX", nba_id: 1610612756, subreddit: "suns", aliases: &["suns", "phoenix"] },
    Team { name: "Portland Trail Blazers", abbreviation: "POR", nba_id: 1610612757, subreddit: "ripcity", aliases: &["trail blazers", "blazers", "portland", "portland blazers"] },
    Team { name: "Sacramento Kings", abbreviation: "SAC", nba_id: 1610612758, subreddit: "kings", aliases: &["kings", "sacramento"] },
    Team { name: "San Antonio Spurs", abbreviation: "SAS", nba_id: 1610612759, subreddit: "nbaspurs", aliases: &["spurs", "san antonio", "sa"] },
    Team { name: "Oklahoma City Thunder", abbreviation: "OKC", nba_id: 1610612760, subreddit: "thunder", aliases: &["thunder", "oklahoma city", "okc thunder"] },
    Team { name: "Toronto Raptors", abbreviation: "TOR", nba_id: 1610612761, subreddit: "torontoraptors", aliases: &["raptors", "toronto", "raps"] },
    Team { name: "Utah Jazz", abbreviation: "UTA", nba_id: 1610612762, subreddit: "utahjazz", aliases: &["jazz", "utah"] },
    Team { name: "Memphis Grizzlies", abbreviation: "MEM", nba_id: 1610612763, subreddit: "memphisgrizzlies", aliases: &["grizzlies", "grizz", "memphis"] },
    Team { name: "Washington Wizards", abbreviation: "WAS", nba_id: 1610612764, subreddit: "washingtonwizards", aliases: &["wizards", "washington", "wiz"] },
    Team { name: "Detroit Pistons", abbreviation: "DET", nba_id: 1610612765, subreddit: "detroitpistons", aliases: &["pistons", "detroit"] },
    Team { name: "Charlotte Hornets", abbreviation: "CHA", nba_id: 1610612766, subreddit: "charlottehornets", aliases: &["hornets", "charlotte"] },
];

pub fn all() -> &'static [Team] {
    TEAMS
}

/// Lowercase, drop periods, collapse runs of whitespace.
fn lookup_key(name: &str) -> String {
    name.to_lowercase()
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn lookup(name: &str) -> Option<&'static Team> {
    let key = lookup_key(name);
    if key.is_empty() {
        return None;
    }
    TEAMS.iter().find(|t| {
        t.name.to_lowercase() == key
            || t.abbreviation.to_lowercase() == key
            || t.aliases.contains(&key.as_str())
    })
}

/// Official franchise name, or the input trimmed and title-cased when unknown.
pub fn normalize_team_name(name: &str) -> String {
    match lookup(name) {
        Some(team) => team.name.to_string(),
        None => title_case(name),
    }
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
