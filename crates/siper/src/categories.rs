//! Built-in quick-add site categories

/// A predefined group of distracting sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Social,
    Video,
    News,
    Gaming,
    Shopping,
    Adult,
    Crypto,
    Torrent,
    Education,
    Work,
    Music,
    Sports,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Social,
        Category::Video,
        Category::News,
        Category::Gaming,
        Category::Shopping,
        Category::Adult,
        Category::Crypto,
        Category::Torrent,
        Category::Education,
        Category::Work,
        Category::Music,
        Category::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Social => "social",
            Category::Video => "video",
            Category::News => "news",
            Category::Gaming => "gaming",
            Category::Shopping => "shopping",
            Category::Adult => "adult",
            Category::Crypto => "crypto",
            Category::Torrent => "torrent",
            Category::Education => "education",
            Category::Work => "work",
            Category::Music => "music",
            Category::Sports => "sports",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Domains in this category; some carry a path and are normalized on add
    pub fn sites(&self) -> &'static [&'static str] {
        match self {
            Category::Social => &[
                "facebook.com", "twitter.com", "x.com", "instagram.com", "tiktok.com",
                "linkedin.com", "snapchat.com", "pinterest.com", "reddit.com", "discord.com",
                "telegram.org", "whatsapp.com", "messenger.com", "clubhouse.com",
                "mastodon.social", "threads.net", "vk.com", "weibo.com", "tumblr.com",
                "flickr.com", "meetup.com",
            ],
            Category::Video => &[
                "youtube.com", "netflix.com", "twitch.tv", "vimeo.com", "dailymotion.com",
                "hulu.com", "disneyplus.com", "primevideo.com", "hbomax.com", "crunchyroll.com",
                "peacocktv.com", "paramountplus.com", "appletv.com", "funimation.com", "vrv.co",
                "puhutv.com", "exxen.com", "blutv.com", "gain.tv", "tabii.com", "netflix.com.tr",
            ],
            Category::News => &[
                "cnn.com", "bbc.com", "hurriyet.com.tr", "sabah.com.tr", "milliyet.com.tr",
                "sozcu.com.tr", "haberturk.com", "ntv.com.tr", "cnnturk.com", "aa.com.tr",
                "reuters.com", "ap.org", "nytimes.com", "washingtonpost.com", "theguardian.com",
                "dw.com", "euronews.com", "aljazeera.com", "ensonhaber.com", "mynet.com",
                "gazetevatan.com", "star.com.tr", "aksam.com.tr", "cumhuriyet.com.tr",
            ],
            Category::Gaming => &[
                "store.steampowered.com", "epicgames.com", "origin.com", "battle.net",
                "riotgames.com", "minecraft.net", "roblox.com", "fortnite.com",
                "leagueoflegends.com", "valorant.com", "ubisoft.com", "ea.com",
                "rockstargames.com", "bethesda.net", "gog.com", "itch.io", "gamepass.com",
                "playstation.com", "xbox.com", "nintendo.com", "twitch.tv", "mixer.com",
                "youtube.com/gaming", "discord.gg",
            ],
            Category::Shopping => &[
                "amazon.com", "amazon.com.tr", "ebay.com", "aliexpress.com", "trendyol.com",
                "hepsiburada.com", "n11.com", "ciceksepeti.com", "morhipo.com", "koton.com",
                "lcwaikiki.com", "defacto.com.tr", "boyner.com.tr", "migros.com.tr",
                "carrefoursa.com", "bim.com.tr", "a101.com.tr", "sok.com.tr", "teknosa.com",
                "vatan.com", "mediamarkt.com.tr", "gittigidiyor.com", "sahibinden.com",
                "letgo.com", "dolap.com", "modanisa.com",
            ],
            Category::Adult => &[
                "pornhub.com", "xvideos.com", "xnxx.com", "redtube.com", "youporn.com",
                "tube8.com", "spankbang.com", "xhamster.com", "beeg.com", "sex.com",
                "chaturbate.com", "cam4.com", "livejasmin.com", "stripchat.com", "bongacams.com",
                "onlyfans.com", "manyvids.com", "clips4sale.com", "motherless.com", "eporner.com",
                "tnaflix.com", "myfreecams.com", "camsoda.com", "adultfriendfinder.com",
            ],
            Category::Crypto => &[
                "binance.com", "coinbase.com", "kraken.com", "bitfinex.com", "huobi.com",
                "kucoin.com", "gate.io", "bybit.com", "okx.com", "crypto.com", "gemini.com",
                "bitstamp.net", "bittrex.com", "poloniex.com", "ftx.com", "pancakeswap.org",
                "uniswap.org", "sushiswap.org", "1inch.io", "compound.finance", "btcturk.com",
                "paribu.com", "bitexen.com", "thodex.com", "icrypex.com",
            ],
            Category::Torrent => &[
                "thepiratebay.org", "1337x.to", "rarbg.to", "yts.mx", "eztv.re", "torrentz2.eu",
                "limetorrents.info", "zooqle.com", "torlock.com", "kickasstorrents.to", "nyaa.si",
                "rutracker.org", "torrentgalaxy.to", "glodls.to", "torrentdownloads.me",
                "seedpeer.me", "torrenthound.com", "demonoid.is", "extratorrent.cc", "isohunt.to",
            ],
            Category::Education => &[
                "coursera.org", "udemy.com", "edx.org", "khanacademy.org", "codecademy.com",
                "pluralsight.com", "lynda.com", "skillshare.com", "masterclass.com",
                "brilliant.org", "duolingo.com", "babbel.com", "memrise.com", "quizlet.com",
                "chegg.com", "studyblue.com", "coursehero.com", "scribd.com", "academia.edu",
                "researchgate.net", "acikders.ankara.edu.tr", "uzaktan.istanbul.edu.tr",
                "auzef.istanbul.edu.tr",
            ],
            Category::Work => &[
                "linkedin.com", "indeed.com", "glassdoor.com", "monster.com", "ziprecruiter.com",
                "careerbuilder.com", "upwork.com", "freelancer.com", "fiverr.com", "99designs.com",
                "slack.com", "teams.microsoft.com", "zoom.us", "meet.google.com", "webex.com",
                "trello.com", "asana.com", "notion.so", "monday.com", "basecamp.com",
                "kariyer.net", "yenibiris.com", "secretcv.com", "elemanonline.com",
                "randstad.com.tr",
            ],
            Category::Music => &[
                "spotify.com", "apple.com/music", "music.youtube.com", "soundcloud.com",
                "pandora.com", "deezer.com", "tidal.com", "amazon.com/music", "last.fm",
                "bandcamp.com", "mixcloud.com", "8tracks.com", "audiomack.com",
                "reverbnation.com", "genius.com", "shazam.com", "musixmatch.com", "songkick.com",
                "setlist.fm", "discogs.com", "muud.com", "fizy.com", "musicmax.com",
                "radyodinle.fm",
            ],
            Category::Sports => &[
                "espn.com", "bleacherreport.com", "sbnation.com", "thescore.com", "cbssports.com",
                "foxsports.com", "skysports.com", "bbc.com/sport", "eurosport.com", "goal.com",
                "transfermarkt.com", "whoscored.com", "flashscore.com", "livescore.com",
                "sofascore.com", "fanatik.com.tr", "fotomac.com.tr", "aspor.com.tr", "sporx.com",
                "ntvspor.net", "trtspor.com.tr", "beinsports.com.tr", "spor.com", "mackolik.com",
                "nesine.com",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site;

    #[test]
    fn test_category_roundtrip() {
        for c in Category::ALL {
            assert_eq!(Category::from_str(c.as_str()), Some(c));
        }
        assert_eq!(Category::from_str(" Social "), Some(Category::Social));
        assert_eq!(Category::from_str("podcasts"), None);
    }

    #[test]
    fn test_every_entry_normalizes() {
        for c in Category::ALL {
            assert!(!c.sites().is_empty());
            for raw in c.sites() {
                assert!(site::normalize(raw).is_some(), "{} in {}", raw, c.as_str());
            }
        }
    }
}
