//! Shared fixtures for integration tests.

#![allow(dead_code)]

/// Hash of the first (up to) four bytes of a key, little endian.
///
/// Keys sharing a four byte head collide fully, which makes collision
/// buckets easy to reach.
#[allow(clippy::ptr_arg)]
pub fn leading_bytes(key: &String) -> u32 {
    key.bytes()
        .take(4)
        .enumerate()
        .fold(0, |hash, (position, byte)| hash | (u32::from(byte) << (8 * position)))
}

/// A country record, keyed by its two letter code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
}

pub fn countries() -> Vec<Country> {
    COUNTRIES
        .iter()
        .map(|&(code, name)| Country { code, name })
        .collect()
}

pub const COUNTRIES: [(&str, &str); 175] = [
    ("af", "Afghanistan"),
    ("al", "Albania"),
    ("dz", "Algeria"),
    ("ao", "Angola"),
    ("ai", "Anguilla"),
    ("ag", "Antigua and Barbuda"),
    ("ar", "Argentina"),
    ("am", "Armenia"),
    ("au", "Australia"),
    ("at", "Austria"),
    ("az", "Azerbaijan"),
    ("bs", "Bahamas"),
    ("bh", "Bahrain"),
    ("bb", "Barbados"),
    ("by", "Belarus"),
    ("be", "Belgium"),
    ("bz", "Belize"),
    ("bj", "Benin"),
    ("bm", "Bermuda"),
    ("bt", "Bhutan"),
    ("bo", "Bolivia"),
    ("ba", "Bosnia and Herzegovina"),
    ("bw", "Botswana"),
    ("br", "Brazil"),
    ("vg", "British Virgin Islands"),
    ("bn", "Brunei"),
    ("bg", "Bulgaria"),
    ("bf", "Burkina-Faso"),
    ("kh", "Cambodia"),
    ("cm", "Cameroon"),
    ("ca", "Canada"),
    ("cv", "Cape Verde"),
    ("ky", "Cayman Islands"),
    ("td", "Chad"),
    ("cl", "Chile"),
    ("cn", "China"),
    ("co", "Colombia"),
    ("cr", "Costa Rica"),
    ("ci", "Cote d'Ivoire"),
    ("hr", "Croatia"),
    ("cy", "Cyprus"),
    ("cz", "Czech Republic"),
    ("cd", "Democratic Republic of the Congo"),
    ("cg", "Republic of the Congo"),
    ("dk", "Denmark"),
    ("dm", "Dominica"),
    ("do", "Dominican Republic"),
    ("ec", "Ecuador"),
    ("eg", "Egypt"),
    ("sv", "El Salvador"),
    ("ee", "Estonia"),
    ("fm", "Federated States of Micronesia"),
    ("fj", "Fiji"),
    ("fi", "Finland"),
    ("fr", "France"),
    ("ga", "Gabon"),
    ("gm", "Gambia"),
    ("de", "Germany"),
    ("ge", "Georgia"),
    ("gh", "Ghana"),
    ("gb", "Great Britain"),
    ("gr", "Greece"),
    ("gd", "Grenada"),
    ("gt", "Guatemala"),
    ("gw", "Guinea Bissau"),
    ("gy", "Guyana"),
    ("hn", "Honduras"),
    ("hk", "Hong Kong"),
    ("hu", "Hungaria"),
    ("is", "Iceland"),
    ("in", "India"),
    ("id", "Indonesia"),
    ("iq", "Iraq"),
    ("ie", "Ireland"),
    ("il", "Israel"),
    ("it", "Italy"),
    ("jm", "Jamaica"),
    ("jp", "Japan"),
    ("jo", "Jordan"),
    ("kz", "Kazakhstan"),
    ("xk", "Kosovo"),
    ("ke", "Kenya"),
    ("kg", "Krygyzstan"),
    ("kw", "Kuwait"),
    ("la", "Laos"),
    ("lv", "Latvia"),
    ("lb", "Lebanon"),
    ("lr", "Liberia"),
    ("ly", "Libya"),
    ("lt", "Lithuania"),
    ("lu", "Luxembourg"),
    ("mo", "Macau"),
    ("mk", "Macedonia"),
    ("mg", "Madagascar"),
    ("mw", "Malawi"),
    ("my", "Malaysia"),
    ("ml", "Mali"),
    ("mv", "Maldives"),
    ("mt", "Malta"),
    ("mr", "Mauritania"),
    ("mu", "Mauritius"),
    ("mx", "Mexico"),
    ("md", "Moldova"),
    ("mn", "Mongolia"),
    ("me", "Montenegro"),
    ("ms", "Montserrat"),
    ("ma", "Morocco"),
    ("mz", "Mozambique"),
    ("mm", "Myanmar"),
    ("nr", "Nauru"),
    ("na", "Namibia"),
    ("np", "Nepal"),
    ("nl", "Netherlands"),
    ("nz", "New Zealand"),
    ("ni", "Nicaragua"),
    ("ne", "Niger"),
    ("ng", "Nigeria"),
    ("no", "Norway"),
    ("om", "Oman"),
    ("pk", "Pakistan"),
    ("pw", "Palau"),
    ("pa", "Panama"),
    ("pg", "Papua New Guinea"),
    ("py", "Paraguay"),
    ("pe", "Peru"),
    ("ph", "Philippines"),
    ("pl", "Poland"),
    ("pt", "Portugal"),
    ("qa", "Qatar"),
    ("tt", "Republic of Trinidad and Tobago"),
    ("ro", "Romania"),
    ("ru", "Russia"),
    ("rw", "Rwanda"),
    ("kn", "Saint Kitts and Nevis"),
    ("lc", "Saint Lucia"),
    ("vc", "Saint Vincent and the Grenadines"),
    ("st", "São Tomé e Príncipe"),
    ("sa", "Saudi Arabia"),
    ("sn", "Senegal"),
    ("rs", "Serbia"),
    ("sc", "Seychelles"),
    ("sl", "Sierra Leone"),
    ("sg", "Singapore"),
    ("sk", "Slovakia"),
    ("si", "Slovenia"),
    ("sb", "Soloman Islands"),
    ("za", "South Africa"),
    ("kr", "South Korea"),
    ("es", "Spain"),
    ("lk", "Sri Lanka"),
    ("sr", "Suriname"),
    ("sz", "Swaziland"),
    ("se", "Sweden"),
    ("ch", "Switzerland"),
    ("tw", "Taiwan"),
    ("tj", "Tajikistan"),
    ("tz", "Tanzania"),
    ("th", "Thailand"),
    ("to", "Tonga"),
    ("tn", "Tunisia"),
    ("tr", "Turkey"),
    ("tm", "Turkmenistan"),
    ("tc", "Turks and Caicos Islands"),
    ("ug", "Uganda"),
    ("ua", "Ukraine"),
    ("ae", "United Arab Emirates"),
    ("us", "United States of America"),
    ("uy", "Uruguay"),
    ("uz", "Uzbekistan"),
    ("vu", "Vanatu"),
    ("ve", "Venezuela"),
    ("vn", "Vietnam"),
    ("ye", "Yemen"),
    ("zm", "Zambia"),
    ("zw", "Zimbabwe"),
];
