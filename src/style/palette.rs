//! Named color palette and color notation conversion.
//!
//! Shades are stored in `oklch()` notation, the form newer Tailwind builds
//! publish. Color pickers work in hex, so every lookup goes through
//! [`oklch_to_hex`] before it reaches a control.

use regex::Regex;
use std::sync::OnceLock;

/// Hex value shown for tokens that carry no resolvable color.
pub const FALLBACK_HEX: &str = "#000000";

const SINGLETONS: &[(&str, &str)] = &[("black", "#000000"), ("white", "#ffffff")];

#[rustfmt::skip]
const PALETTE: &[(&str, &[(u16, &str)])] = &[
    ("slate", &[
        (50, "oklch(98.42% 0.0034 247.858)"),
        (100, "oklch(96.83% 0.0069 247.896)"),
        (200, "oklch(92.88% 0.0126 255.508)"),
        (300, "oklch(86.9% 0.0198 252.894)"),
        (400, "oklch(71.07% 0.0351 256.788)"),
        (500, "oklch(55.44% 0.0407 257.417)"),
        (600, "oklch(44.55% 0.0374 257.281)"),
        (700, "oklch(37.17% 0.0392 257.287)"),
        (800, "oklch(27.95% 0.0368 260.031)"),
        (900, "oklch(20.77% 0.0398 265.755)"),
        (950, "oklch(12.88% 0.0406 264.695)"),
    ]),
    ("gray", &[
        (50, "oklch(98.46% 0.0017 247.839)"),
        (100, "oklch(96.7% 0.0029 264.542)"),
        (200, "oklch(92.76% 0.0058 264.531)"),
        (300, "oklch(87.17% 0.0093 258.338)"),
        (400, "oklch(71.37% 0.0192 261.325)"),
        (500, "oklch(55.1% 0.0234 264.364)"),
        (600, "oklch(44.61% 0.0263 256.802)"),
        (700, "oklch(37.29% 0.0306 259.733)"),
        (800, "oklch(27.81% 0.0296 256.848)"),
        (900, "oklch(21.01% 0.0318 264.665)"),
        (950, "oklch(12.96% 0.0274 261.692)"),
    ]),
    ("zinc", &[
        (50, "oklch(98.51% 0 89.876)"),
        (100, "oklch(96.74% 0.0013 286.375)"),
        (200, "oklch(91.97% 0.004 286.32)"),
        (300, "oklch(87.11% 0.0055 286.286)"),
        (400, "oklch(71.18% 0.0129 286.067)"),
        (500, "oklch(55.17% 0.0138 285.938)"),
        (600, "oklch(44.19% 0.0146 285.786)"),
        (700, "oklch(37.03% 0.0119 285.805)"),
        (800, "oklch(27.39% 0.0055 286.033)"),
        (900, "oklch(21.03% 0.0059 285.885)"),
        (950, "oklch(14.08% 0.0044 285.823)"),
    ]),
    ("neutral", &[
        (50, "oklch(98.51% 0 89.876)"),
        (100, "oklch(97.02% 0 89.876)"),
        (200, "oklch(92.19% 0 89.876)"),
        (300, "oklch(86.99% 0 89.876)"),
        (400, "oklch(71.55% 0 89.876)"),
        (500, "oklch(55.55% 0 89.876)"),
        (600, "oklch(43.86% 0 89.876)"),
        (700, "oklch(37.15% 0 89.876)"),
        (800, "oklch(26.86% 0 89.876)"),
        (900, "oklch(20.46% 0 89.876)"),
        (950, "oklch(14.48% 0 89.876)"),
    ]),
    ("stone", &[
        (50, "oklch(98.48% 0.0013 106.423)"),
        (100, "oklch(96.99% 0.0013 106.424)"),
        (200, "oklch(92.32% 0.0026 48.717)"),
        (300, "oklch(86.87% 0.0043 56.366)"),
        (400, "oklch(71.61% 0.0091 56.259)"),
        (500, "oklch(55.34% 0.0116 58.071)"),
        (600, "oklch(44.44% 0.0096 73.639)"),
        (700, "oklch(37.41% 0.0087 67.558)"),
        (800, "oklch(26.85% 0.0063 34.298)"),
        (900, "oklch(21.61% 0.0061 56.043)"),
        (950, "oklch(14.69% 0.0041 49.25)"),
    ]),
    ("red", &[
        (50, "oklch(97.05% 0.0129 17.38)"),
        (100, "oklch(93.56% 0.0309 17.717)"),
        (200, "oklch(88.45% 0.0593 18.334)"),
        (300, "oklch(80.77% 0.1035 19.571)"),
        (400, "oklch(71.06% 0.1661 22.216)"),
        (500, "oklch(63.68% 0.2078 25.331)"),
        (600, "oklch(57.71% 0.2152 27.325)"),
        (700, "oklch(50.54% 0.1905 27.518)"),
        (800, "oklch(44.37% 0.1613 26.899)"),
        (900, "oklch(39.58% 0.1331 25.723)"),
        (950, "oklch(25.75% 0.0886 26.042)"),
    ]),
    ("orange", &[
        (50, "oklch(97.96% 0.0158 73.684)"),
        (100, "oklch(95.42% 0.0372 75.164)"),
        (200, "oklch(90.15% 0.0729 70.697)"),
        (300, "oklch(83.66% 0.1165 66.29)"),
        (400, "oklch(75.76% 0.159 55.934)"),
        (500, "oklch(70.49% 0.1867 47.604)"),
        (600, "oklch(64.61% 0.1943 41.116)"),
        (700, "oklch(55.34% 0.1739 38.402)"),
        (800, "oklch(46.98% 0.143 37.304)"),
        (900, "oklch(40.84% 0.1165 38.172)"),
        (950, "oklch(26.59% 0.0762 36.259)"),
    ]),
    ("amber", &[
        (50, "oklch(98.69% 0.0214 95.277)"),
        (100, "oklch(96.19% 0.058 95.617)"),
        (200, "oklch(92.43% 0.1151 95.746)"),
        (300, "oklch(87.9% 0.1534 91.605)"),
        (400, "oklch(83.69% 0.1644 84.429)"),
        (500, "oklch(76.86% 0.1647 70.08)"),
        (600, "oklch(66.58% 0.1574 58.318)"),
        (700, "oklch(55.53% 0.1455 48.998)"),
        (800, "oklch(47.32% 0.1247 46.201)"),
        (900, "oklch(41.37% 0.1054 45.904)"),
        (950, "oklch(27.91% 0.0742 45.635)"),
    ]),
    ("yellow", &[
        (50, "oklch(98.73% 0.0262 102.212)"),
        (100, "oklch(97.29% 0.0693 103.193)"),
        (200, "oklch(94.51% 0.1243 101.54)"),
        (300, "oklch(90.52% 0.1657 98.111)"),
        (400, "oklch(86.06% 0.1731 91.936)"),
        (500, "oklch(79.52% 0.1617 86.047)"),
        (600, "oklch(68.06% 0.1423 75.834)"),
        (700, "oklch(55.38% 0.1207 66.442)"),
        (800, "oklch(47.62% 0.1034 61.907)"),
        (900, "oklch(42.1% 0.0897 57.708)"),
        (950, "oklch(28.57% 0.0639 53.813)"),
    ]),
    ("lime", &[
        (50, "oklch(98.57% 0.031 120.757)"),
        (100, "oklch(96.69% 0.0659 122.328)"),
        (200, "oklch(93.82% 0.1217 124.321)"),
        (300, "oklch(89.72% 0.1786 126.665)"),
        (400, "oklch(84.93% 0.2073 128.85)"),
        (500, "oklch(76.81% 0.2044 130.85)"),
        (600, "oklch(64.82% 0.1754 131.684)"),
        (700, "oklch(53.22% 0.1405 131.589)"),
        (800, "oklch(45.28% 0.1129 130.933)"),
        (900, "oklch(40.5% 0.0956 131.063)"),
        (950, "oklch(27.41% 0.0688 132.109)"),
    ]),
    ("green", &[
        (50, "oklch(98.19% 0.0181 155.826)"),
        (100, "oklch(96.24% 0.0434 156.743)"),
        (200, "oklch(92.5% 0.0806 155.995)"),
        (300, "oklch(87.12% 0.1363 154.449)"),
        (400, "oklch(80.03% 0.1821 151.711)"),
        (500, "oklch(72.27% 0.192 149.579)"),
        (600, "oklch(62.71% 0.1699 149.214)"),
        (700, "oklch(52.73% 0.1371 150.069)"),
        (800, "oklch(44.79% 0.1083 151.328)"),
        (900, "oklch(39.25% 0.0896 152.535)"),
        (950, "oklch(26.64% 0.0628 152.934)"),
    ]),
    ("emerald", &[
        (50, "oklch(97.93% 0.0207 166.113)"),
        (100, "oklch(95.05% 0.0507 163.051)"),
        (200, "oklch(90.49% 0.0895 164.15)"),
        (300, "oklch(84.52% 0.1299 164.978)"),
        (400, "oklch(77.29% 0.1535 163.223)"),
        (500, "oklch(69.59% 0.1491 162.48)"),
        (600, "oklch(59.6% 0.1274 163.225)"),
        (700, "oklch(50.81% 0.1049 165.612)"),
        (800, "oklch(43.18% 0.0865 166.913)"),
        (900, "oklch(37.8% 0.073 168.94)"),
        (950, "oklch(26.21% 0.0487 172.552)"),
    ]),
    ("teal", &[
        (50, "oklch(98.36% 0.0142 180.72)"),
        (100, "oklch(95.27% 0.0498 180.801)"),
        (200, "oklch(91% 0.0927 180.426)"),
        (300, "oklch(85.49% 0.1251 181.071)"),
        (400, "oklch(78.45% 0.1325 181.912)"),
        (500, "oklch(70.38% 0.123 182.503)"),
        (600, "oklch(60.02% 0.1038 184.704)"),
        (700, "oklch(51.09% 0.0861 186.391)"),
        (800, "oklch(43.7% 0.0705 188.216)"),
        (900, "oklch(38.61% 0.059 188.416)"),
        (950, "oklch(27.73% 0.0447 192.524)"),
    ]),
    ("cyan", &[
        (50, "oklch(98.41% 0.0189 200.873)"),
        (100, "oklch(95.63% 0.0443 203.388)"),
        (200, "oklch(91.67% 0.0772 205.041)"),
        (300, "oklch(86.51% 0.1153 207.078)"),
        (400, "oklch(79.71% 0.1339 211.53)"),
        (500, "oklch(71.48% 0.1257 215.221)"),
        (600, "oklch(60.89% 0.1109 221.723)"),
        (700, "oklch(51.98% 0.0936 223.128)"),
        (800, "oklch(45% 0.0771 224.283)"),
        (900, "oklch(39.82% 0.0664 227.392)"),
        (950, "oklch(30.18% 0.0541 229.695)"),
    ]),
    ("sky", &[
        (50, "oklch(97.71% 0.0125 236.62)"),
        (100, "oklch(95.14% 0.025 236.824)"),
        (200, "oklch(90.14% 0.0555 230.902)"),
        (300, "oklch(82.76% 0.1013 230.318)"),
        (400, "oklch(75.35% 0.139 232.661)"),
        (500, "oklch(68.47% 0.1479 237.323)"),
        (600, "oklch(58.76% 0.1389 241.966)"),
        (700, "oklch(50% 0.1193 242.749)"),
        (800, "oklch(44.34% 0.1 240.79)"),
        (900, "oklch(39.12% 0.0845 240.876)"),
        (950, "oklch(29.35% 0.0632 243.157)"),
    ]),
    ("blue", &[
        (50, "oklch(97.05% 0.0142 254.604)"),
        (100, "oklch(93.19% 0.0316 255.585)"),
        (200, "oklch(88.23% 0.0571 254.128)"),
        (300, "oklch(80.91% 0.0956 251.813)"),
        (400, "oklch(71.37% 0.1434 254.624)"),
        (500, "oklch(62.31% 0.188 259.815)"),
        (600, "oklch(54.61% 0.2152 262.881)"),
        (700, "oklch(48.82% 0.2172 264.376)"),
        (800, "oklch(42.44% 0.1809 265.638)"),
        (900, "oklch(37.91% 0.1378 265.522)"),
        (950, "oklch(28.23% 0.0874 267.935)"),
    ]),
    ("indigo", &[
        (50, "oklch(96.19% 0.0179 272.314)"),
        (100, "oklch(92.99% 0.0334 272.788)"),
        (200, "oklch(86.99% 0.0622 274.039)"),
        (300, "oklch(78.53% 0.1041 274.713)"),
        (400, "oklch(68.01% 0.1583 276.935)"),
        (500, "oklch(58.54% 0.2041 277.117)"),
        (600, "oklch(51.06% 0.2301 276.966)"),
        (700, "oklch(45.68% 0.2146 277.023)"),
        (800, "oklch(39.84% 0.1773 277.366)"),
        (900, "oklch(35.88% 0.1354 278.697)"),
        (950, "oklch(25.73% 0.0861 281.288)"),
    ]),
    ("violet", &[
        (50, "oklch(96.91% 0.0161 293.756)"),
        (100, "oklch(94.33% 0.0284 294.588)"),
        (200, "oklch(89.43% 0.0549 293.283)"),
        (300, "oklch(81.12% 0.1013 293.571)"),
        (400, "oklch(70.9% 0.1592 293.541)"),
        (500, "oklch(60.56% 0.2189 292.717)"),
        (600, "oklch(54.13% 0.2466 293.009)"),
        (700, "oklch(49.07% 0.2412 292.581)"),
        (800, "oklch(43.2% 0.2106 292.759)"),
        (900, "oklch(37.96% 0.1783 293.745)"),
        (950, "oklch(28.27% 0.1351 291.089)"),
    ]),
    ("purple", &[
        (50, "oklch(97.68% 0.0142 308.299)"),
        (100, "oklch(94.64% 0.0327 307.174)"),
        (200, "oklch(90.24% 0.0604 306.703)"),
        (300, "oklch(82.68% 0.1082 306.383)"),
        (400, "oklch(72.17% 0.1767 305.504)"),
        (500, "oklch(62.68% 0.2325 303.9)"),
        (600, "oklch(55.75% 0.2525 302.321)"),
        (700, "oklch(49.55% 0.2369 301.924)"),
        (800, "oklch(43.83% 0.1983 303.724)"),
        (900, "oklch(38.07% 0.1661 304.987)"),
        (950, "oklch(29.05% 0.1432 302.717)"),
    ]),
    ("fuchsia", &[
        (50, "oklch(97.73% 0.0173 320.058)"),
        (100, "oklch(95.2% 0.036 318.852)"),
        (200, "oklch(90.3% 0.0732 319.62)"),
        (300, "oklch(83.3% 0.1322 321.434)"),
        (400, "oklch(74.77% 0.207 322.16)"),
        (500, "oklch(66.68% 0.2591 322.15)"),
        (600, "oklch(59.15% 0.2569 322.896)"),
        (700, "oklch(51.8% 0.2258 323.949)"),
        (800, "oklch(45.19% 0.1922 324.591)"),
        (900, "oklch(40.07% 0.1601 325.612)"),
        (950, "oklch(29.32% 0.1309 325.661)"),
    ]),
    ("pink", &[
        (50, "oklch(97.14% 0.0141 343.198)"),
        (100, "oklch(94.82% 0.0276 342.258)"),
        (200, "oklch(89.94% 0.0589 343.231)"),
        (300, "oklch(82.28% 0.1095 346.018)"),
        (400, "oklch(72.53% 0.1752 349.761)"),
        (500, "oklch(65.59% 0.2118 354.308)"),
        (600, "oklch(59.16% 0.218 0.584)"),
        (700, "oklch(52.46% 0.199 3.958)"),
        (800, "oklch(45.87% 0.1697 3.815)"),
        (900, "oklch(40.78% 0.1442 2.432)"),
        (950, "oklch(28.45% 0.1048 3.907)"),
    ]),
    ("rose", &[
        (50, "oklch(96.94% 0.0152 12.422)"),
        (100, "oklch(94.14% 0.0298 12.58)"),
        (200, "oklch(89.24% 0.0559 10.001)"),
        (300, "oklch(80.97% 0.1061 11.638)"),
        (400, "oklch(71.92% 0.169 13.428)"),
        (500, "oklch(64.5% 0.2154 16.439)"),
        (600, "oklch(58.58% 0.222 17.585)"),
        (700, "oklch(51.43% 0.1978 16.935)"),
        (800, "oklch(45.46% 0.1713 13.697)"),
        (900, "oklch(41.03% 0.1502 10.272)"),
        (950, "oklch(27.08% 0.1009 12.094)"),
    ]),
];

/// Color value for a palette name and shade, in the notation the table stores.
pub fn lookup(name: &str, shade: u16) -> Option<&'static str> {
    PALETTE
        .iter()
        .find(|(n, _)| *n == name)?
        .1
        .iter()
        .find(|(s, _)| *s == shade)
        .map(|(_, v)| *v)
}

pub fn palette_names() -> impl Iterator<Item = &'static str> {
    PALETTE.iter().map(|(n, _)| *n)
}

/// `"#3b82f6"` / `"3b82f6"` / `"#38f"` → `(59, 130, 246)`.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|d| d * 17);
            Some((digit(0).ok()?, digit(1).ok()?, digit(2).ok()?))
        }
        _ => None,
    }
}

pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Converts an `rgb()`/`rgba()` string from a picker callback to hex. Alpha is dropped.
pub fn rgba_to_hex(value: &str) -> Option<String> {
    static RGBA_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = RGBA_REGEX.get_or_init(|| {
        Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[0-9.]+%?\s*)?\)$")
            .unwrap()
    });
    let caps = re.captures(value.trim())?;
    let channel = |i: usize| caps[i].parse::<u16>().ok().filter(|v| *v <= 255).map(|v| v as u8);
    Some(rgb_to_hex(channel(1)?, channel(2)?, channel(3)?))
}

/// Parses `oklch(L% C H)` (lightness may also be a 0..1 number).
pub fn parse_oklch(value: &str) -> Option<(f64, f64, f64)> {
    static OKLCH_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = OKLCH_REGEX.get_or_init(|| {
        Regex::new(r"^oklch\(\s*([0-9.]+)(%?)\s+([0-9.]+)\s+([0-9.]+)(?:deg)?\s*(?:/\s*[0-9.]+%?\s*)?\)$")
            .unwrap()
    });
    let caps = re.captures(value.trim())?;
    let mut l: f64 = caps[1].parse().ok()?;
    if &caps[2] == "%" {
        l /= 100.0;
    }
    let c: f64 = caps[3].parse().ok()?;
    let h: f64 = caps[4].parse().ok()?;
    Some((l, c, h))
}

/// `oklch()` → `#rrggbb`, through OKLab and linear sRGB, clamped to the sRGB gamut.
pub fn oklch_to_hex(value: &str) -> Option<String> {
    let (l, c, h) = parse_oklch(value)?;
    let hue = h.to_radians();
    let (a, b) = (c * hue.cos(), c * hue.sin());

    let l_ = l + 0.396_337_777_4 * a + 0.215_803_757_3 * b;
    let m_ = l - 0.105_561_345_8 * a - 0.063_854_172_8 * b;
    let s_ = l - 0.089_484_177_5 * a - 1.291_485_548_0 * b;
    let (l3, m3, s3) = (l_.powi(3), m_.powi(3), s_.powi(3));

    let red = 4.076_741_662_1 * l3 - 3.307_711_591_3 * m3 + 0.230_969_929_2 * s3;
    let green = -1.268_438_004_6 * l3 + 2.609_757_401_1 * m3 - 0.341_319_396_5 * s3;
    let blue = -0.004_196_086_3 * l3 - 0.703_418_614_7 * m3 + 1.707_614_701_0 * s3;

    Some(rgb_to_hex(encode_srgb(red), encode_srgb(green), encode_srgb(blue)))
}

fn encode_srgb(linear: f64) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Any supported color notation (hex, `rgb()`, `oklch()`) → lowercase `#rrggbb`.
pub fn to_hex(value: &str) -> Option<String> {
    let value = value.trim();
    if value.starts_with("oklch(") {
        oklch_to_hex(value)
    } else if value.starts_with("rgb") {
        rgba_to_hex(value)
    } else {
        hex_to_rgb(value).map(|(r, g, b)| rgb_to_hex(r, g, b))
    }
}

/// Hex value for the color part of a token (`blue-500`, `white`, `[#ff0000]`).
pub fn color_value_to_hex(value: &str) -> Option<String> {
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        return to_hex(&inner.replace('_', " "));
    }
    if let Some((_, hex)) = SINGLETONS.iter().find(|(n, _)| *n == value) {
        return Some(hex.to_string());
    }
    let color_part = value.split('/').next().unwrap_or(value);
    let dash = color_part.rfind('-')?;
    let shade: u16 = color_part[dash + 1..].parse().ok()?;
    oklch_to_hex(lookup(&color_part[..dash], shade)?)
}

/// Hex shown in a color picker for a color-bearing class token
/// (`bg-blue-500`, `text-[#ff0000]`, `border-white`). Unknown colors show as black.
pub fn token_to_hex(token: &str) -> String {
    ["text-", "bg-", "border-"]
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix))
        .and_then(color_value_to_hex)
        .unwrap_or_else(|| FALLBACK_HEX.to_string())
}
