//! Static table of named device profiles used for emulation

use once_cell::sync::Lazy;
use regex::RegexBuilder;

/// Concrete viewport dimensions and emulation flags of a device profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceViewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
    pub is_landscape: bool,
}

/// A named viewport + user-agent bundle emulating a real browser/OS/hardware combination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Device {
    /// Normalized name: lowercase, whitespace replaced by hyphens
    pub name: &'static str,
    pub user_agent: &'static str,
    pub viewport: DeviceViewport,
}

const fn mobile(width: u32, height: u32, device_scale_factor: f64, is_landscape: bool) -> DeviceViewport {
    DeviceViewport {
        width,
        height,
        device_scale_factor,
        is_mobile: true,
        has_touch: true,
        is_landscape,
    }
}

const fn desktop(width: u32, height: u32) -> DeviceViewport {
    DeviceViewport {
        width,
        height,
        device_scale_factor: 1.0,
        is_mobile: false,
        has_touch: false,
        is_landscape: false,
    }
}

const UA_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 11_0 like Mac OS X) AppleWebKit/604.1.38 (KHTML, like Gecko) Version/11.0 Mobile/15A372 Safari/604.1";
const UA_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 11_0 like Mac OS X) AppleWebKit/604.1.34 (KHTML, like Gecko) Version/11.0 Mobile/15A5341f Safari/604.1";

/// All known devices, portrait and landscape variants included
pub static DEVICES: &[Device] = &[
    Device {
        name: "blackberry-z30",
        user_agent: "Mozilla/5.0 (BB10; Touch) AppleWebKit/537.10+ (KHTML, like Gecko) Version/10.0.9.2372 Mobile Safari/537.10+",
        viewport: mobile(360, 640, 2.0, false),
    },
    Device {
        name: "blackberry-z30-landscape",
        user_agent: "Mozilla/5.0 (BB10; Touch) AppleWebKit/537.10+ (KHTML, like Gecko) Version/10.0.9.2372 Mobile Safari/537.10+",
        viewport: mobile(640, 360, 2.0, true),
    },
    Device {
        name: "galaxy-note-3",
        user_agent: "Mozilla/5.0 (Linux; U; Android 4.3; en-us; SM-N900T Build/JSS15J) AppleWebKit/534.30 (KHTML, like Gecko) Version/4.0 Mobile Safari/534.30",
        viewport: mobile(360, 640, 3.0, false),
    },
    Device {
        name: "galaxy-s5",
        user_agent: "Mozilla/5.0 (Linux; Android 5.0; SM-G900P Build/LRX21T) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Mobile Safari/537.36",
        viewport: mobile(360, 640, 3.0, false),
    },
    Device {
        name: "galaxy-s5-landscape",
        user_agent: "Mozilla/5.0 (Linux; Android 5.0; SM-G900P Build/LRX21T) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Mobile Safari/537.36",
        viewport: mobile(640, 360, 3.0, true),
    },
    Device {
        name: "ipad",
        user_agent: UA_IPAD,
        viewport: mobile(768, 1024, 2.0, false),
    },
    Device {
        name: "ipad-landscape",
        user_agent: UA_IPAD,
        viewport: mobile(1024, 768, 2.0, true),
    },
    Device {
        name: "ipad-mini",
        user_agent: UA_IPAD,
        viewport: mobile(768, 1024, 2.0, false),
    },
    Device {
        name: "ipad-pro",
        user_agent: UA_IPAD,
        viewport: mobile(1024, 1366, 2.0, false),
    },
    Device {
        name: "iphone-6",
        user_agent: UA_IPHONE,
        viewport: mobile(375, 667, 2.0, false),
    },
    Device {
        name: "iphone-6-landscape",
        user_agent: UA_IPHONE,
        viewport: mobile(667, 375, 2.0, true),
    },
    Device {
        name: "iphone-6-plus",
        user_agent: UA_IPHONE,
        viewport: mobile(414, 736, 3.0, false),
    },
    Device {
        name: "iphone-7",
        user_agent: UA_IPHONE,
        viewport: mobile(375, 667, 2.0, false),
    },
    Device {
        name: "iphone-8",
        user_agent: UA_IPHONE,
        viewport: mobile(375, 667, 2.0, false),
    },
    Device {
        name: "iphone-x",
        user_agent: UA_IPHONE,
        viewport: mobile(375, 812, 3.0, false),
    },
    Device {
        name: "iphone-x-landscape",
        user_agent: UA_IPHONE,
        viewport: mobile(812, 375, 3.0, true),
    },
    Device {
        name: "kindle-fire-hdx",
        user_agent: "Mozilla/5.0 (Linux; U; en-us; KFAPWI Build/JDQ39) AppleWebKit/535.19 (KHTML, like Gecko) Silk/3.13 Safari/535.19 Silk-Accelerated=true",
        viewport: mobile(800, 1280, 2.0, false),
    },
    Device {
        name: "nexus-5",
        user_agent: "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Mobile Safari/537.36",
        viewport: mobile(360, 640, 3.0, false),
    },
    Device {
        name: "nexus-7",
        user_agent: "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 7 Build/MOB30X) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Safari/537.36",
        viewport: mobile(600, 960, 2.0, false),
    },
    Device {
        name: "nexus-10",
        user_agent: "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 10 Build/MOB31T) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Safari/537.36",
        viewport: mobile(800, 1280, 2.0, false),
    },
    Device {
        name: "pixel-2",
        user_agent: "Mozilla/5.0 (Linux; Android 8.0; Pixel 2 Build/OPD3.170816.012) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Mobile Safari/537.36",
        viewport: mobile(411, 731, 2.625, false),
    },
    Device {
        name: "pixel-2-xl",
        user_agent: "Mozilla/5.0 (Linux; Android 8.0.0; Pixel 2 XL Build/OPD1.170816.004) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Mobile Safari/537.36",
        viewport: mobile(411, 823, 3.5, false),
    },
    Device {
        name: "desktop-edge",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/42.0.2311.135 Safari/537.36 Edge/12.246",
        viewport: desktop(1920, 1080),
    },
    Device {
        name: "desktop-safari",
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_2) AppleWebKit/601.3.9 (KHTML, like Gecko) Version/9.0.2 Safari/601.3.9",
        viewport: desktop(1920, 1080),
    },
    Device {
        name: "desktop-firefox",
        user_agent: "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:15.0) Gecko/20100101 Firefox/15.0.1",
        viewport: desktop(1920, 1080),
    },
];

/// Collapse whitespace runs to hyphens and lowercase, so "iPhone 6" finds "iphone-6"
pub fn normalize_name(name: &str) -> String {
    static WHITESPACE: Lazy<regex::Regex> =
        Lazy::new(|| regex::Regex::new(r"\s+").expect("whitespace pattern"));
    WHITESPACE.replace_all(name.trim(), "-").to_lowercase()
}

/// Look up a device by (normalized) name
pub fn find(name: &str) -> Option<&'static Device> {
    let name = normalize_name(name);
    DEVICES.iter().find(|d| d.name == name)
}

/// Filter the device table by category.
///
/// The four well-known categories map onto emulation flags; any other token
/// is treated as a case-insensitive regex against device names and may match
/// nothing.
pub fn by_category(category: &str) -> Vec<&'static Device> {
    match category {
        "desktop" => DEVICES.iter().filter(|d| !d.viewport.is_mobile).collect(),
        "touch" => DEVICES.iter().filter(|d| d.viewport.has_touch).collect(),
        "mobile" => DEVICES.iter().filter(|d| d.viewport.is_mobile).collect(),
        "landscape" => DEVICES.iter().filter(|d| d.viewport.is_landscape).collect(),
        other => match RegexBuilder::new(other).case_insensitive(true).build() {
            Ok(pattern) => DEVICES.iter().filter(|d| pattern.is_match(d.name)).collect(),
            Err(_) => Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_normalizes_names() {
        assert!(find("iphone-6").is_some());
        assert!(find("iPhone 6").is_some());
        assert!(find("  Desktop   Firefox ").is_some());
        assert!(find("non-existing").is_none());
    }

    #[test]
    fn test_known_categories_are_non_empty() {
        for category in ["desktop", "touch", "mobile", "landscape"] {
            assert!(!by_category(category).is_empty(), "category {category}");
        }
    }

    #[test]
    fn test_category_flags() {
        assert!(by_category("desktop").iter().all(|d| !d.viewport.is_mobile));
        assert!(by_category("touch").iter().all(|d| d.viewport.has_touch));
        assert!(by_category("landscape").iter().all(|d| d.viewport.is_landscape));
    }

    #[test]
    fn test_free_form_category_is_a_name_filter() {
        assert!(!by_category("blackberry").is_empty());
        assert!(!by_category("iPhone").is_empty());
        assert!(by_category("13456789").is_empty());
    }
}
