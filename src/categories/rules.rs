/// A browsable category and the keywords that pull songs into it.
///
/// Every list holds lowercase keywords. `themes` must equal a song theme,
/// the other lists match as substrings of the corresponding song field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub themes: &'static [&'static str],
    pub sources: &'static [&'static str],
    pub artists: &'static [&'static str],
    pub title_keywords: &'static [&'static str],
}

pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        slug: "worship",
        name: "Worship",
        description: "Songs of adoration and praise",
        themes: &["worship", "praise", "adoration", "glory"],
        sources: &[],
        artists: &[],
        title_keywords: &["worship", "praise", "holy", "glory", "hallelujah"],
    },
    CategoryRule {
        slug: "hymns",
        name: "Hymns",
        description: "Traditional hymns from the hymnals",
        themes: &["hymn", "hymns", "traditional"],
        sources: &["hymnal", "hymns", "hymn"],
        artists: &["charles wesley", "isaac watts", "fanny crosby", "traditional"],
        title_keywords: &[],
    },
    CategoryRule {
        slug: "christmas",
        name: "Christmas",
        description: "Advent and Christmas songs",
        themes: &["christmas", "advent", "nativity", "incarnation"],
        sources: &["christmas"],
        artists: &[],
        title_keywords: &["christmas", "noel", "bethlehem", "manger", "emmanuel"],
    },
    CategoryRule {
        slug: "easter",
        name: "Easter",
        description: "Songs of the cross and the resurrection",
        themes: &["easter", "resurrection", "cross", "good friday"],
        sources: &["easter"],
        artists: &[],
        title_keywords: &["easter", "risen", "resurrection", "the cross", "calvary"],
    },
    CategoryRule {
        slug: "communion",
        name: "Communion",
        description: "Songs for the Lord's supper",
        themes: &["communion", "lord's supper", "eucharist"],
        sources: &[],
        artists: &[],
        title_keywords: &["communion", "bread", "table", "remember"],
    },
    CategoryRule {
        slug: "prayer",
        name: "Prayer",
        description: "Songs of prayer and devotion",
        themes: &["prayer", "devotion", "intercession"],
        sources: &[],
        artists: &[],
        title_keywords: &["prayer", "pray", "hear me", "draw near"],
    },
    CategoryRule {
        slug: "salvation",
        name: "Salvation",
        description: "Songs of grace, redemption and salvation",
        themes: &["salvation", "grace", "redemption", "forgiveness"],
        sources: &[],
        artists: &[],
        title_keywords: &["grace", "saved", "redeemer", "salvation"],
    },
    CategoryRule {
        slug: "contemporary",
        name: "Contemporary",
        description: "Modern worship songs",
        themes: &["contemporary", "modern"],
        sources: &["hillsong", "bethel", "elevation", "passion"],
        artists: &[
            "hillsong",
            "bethel",
            "elevation",
            "chris tomlin",
            "matt redman",
            "maverick city",
            "passion",
        ],
        title_keywords: &[],
    },
    CategoryRule {
        slug: "kids",
        name: "Kids",
        description: "Songs for children's ministry",
        themes: &["kids", "children", "youth"],
        sources: &["kids", "children"],
        artists: &[],
        title_keywords: &["kids", "children"],
    },
];

pub fn find_rule(slug: &str) -> Option<&'static CategoryRule> {
    CATEGORY_RULES.iter().find(|r| r.slug == slug)
}
