//! Static channel directory built from configuration.
//!
//! The directory knows every configured channel by id and by name, along with the HD and +1
//! relationships between channels. It's built (and validated) once and is immutable afterwards,
//! so it can be shared between every managed box and the guide cache.

use std::collections::{BTreeMap, HashMap};

use crate::config::ConfigError;

/// Lowest valid channel number.
pub const MIN_CHANNEL_ID: u16 = 1;
/// Highest valid channel number.
pub const MAX_CHANNEL_ID: u16 = 999;

/// An external entity (such as an AV switcher) which needs to be switched to a given source when
/// the box tunes to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Automation {
    pub target: String,
    pub source: String,
}

/// A single configured channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelEntry {
    pub id: u16,
    pub name: String,
    pub hd_channel: Option<u16>,
    pub plus_one_channel: Option<u16>,
    pub visible: bool,
    pub logo_url: Option<String>,
    pub automation: Option<Automation>,
}

impl ChannelEntry {
    pub fn new(id: u16, name: &str) -> Self {
        ChannelEntry {
            id,
            name: name.to_string(),
            hd_channel: None,
            plus_one_channel: None,
            visible: true,
            logo_url: None,
            automation: None,
        }
    }

    pub fn with_hd_channel(mut self, hd_channel: u16) -> Self {
        self.hd_channel = Some(hd_channel);
        self
    }

    pub fn with_plus_one_channel(mut self, plus_one_channel: u16) -> Self {
        self.plus_one_channel = Some(plus_one_channel);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_logo_url(mut self, logo_url: &str) -> Self {
        self.logo_url = Some(logo_url.to_string());
        self
    }

    pub fn with_automation(mut self, target: &str, source: &str) -> Self {
        self.automation = Some(Automation {
            target: target.to_string(),
            source: source.to_string(),
        });
        self
    }
}

/// Lookup structure over all configured channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelDirectory {
    entries: BTreeMap<u16, ChannelEntry>,
    ids_by_name: HashMap<String, u16>,
    sd_by_hd: HashMap<u16, u16>,
    sd_by_plus_one: HashMap<u16, u16>,
    source_list: Vec<String>,
}

impl ChannelDirectory {
    /// Build a directory from the given channel entries.
    ///
    /// Fails when a channel id is out of range, a name is used twice, or the HD/+1 pairings don't
    /// form a consistent set. Every HD or +1 channel must be the target of exactly one pairing, and
    /// resolving any channel back to its SD channel must take at most two hops (HD, then +1).
    pub fn new(entries: Vec<ChannelEntry>) -> Result<Self, ConfigError> {
        let mut by_id: BTreeMap<u16, ChannelEntry> = BTreeMap::new();
        let mut ids_by_name: HashMap<String, u16> = HashMap::new();

        for entry in entries {
            if !(MIN_CHANNEL_ID..=MAX_CHANNEL_ID).contains(&entry.id) {
                return Err(ConfigError::InvalidChannelId(entry.id.to_string()));
            }

            if ids_by_name.insert(entry.name.clone(), entry.id).is_some() {
                return Err(ConfigError::DuplicateChannelName(entry.name));
            }

            if by_id.insert(entry.id, entry.clone()).is_some() {
                return Err(ConfigError::InvalidChannelId(entry.id.to_string()));
            }
        }

        let mut sd_by_hd: HashMap<u16, u16> = HashMap::new();
        let mut sd_by_plus_one: HashMap<u16, u16> = HashMap::new();

        for entry in by_id.values() {
            if let Some(hd_channel) = entry.hd_channel {
                if !by_id.contains_key(&hd_channel) {
                    return Err(ConfigError::UnknownHdChannel {
                        channel: entry.id,
                        hd_channel,
                    });
                }

                if hd_channel == entry.id {
                    return Err(ConfigError::SelfPairing(entry.id));
                }

                if sd_by_hd.insert(hd_channel, entry.id).is_some()
                    || sd_by_plus_one.contains_key(&hd_channel)
                {
                    return Err(ConfigError::ConflictingPairing(hd_channel));
                }
            }

            if let Some(plus_one_channel) = entry.plus_one_channel {
                if !by_id.contains_key(&plus_one_channel) {
                    return Err(ConfigError::UnknownPlusOneChannel {
                        channel: entry.id,
                        plus_one_channel,
                    });
                }

                if plus_one_channel == entry.id {
                    return Err(ConfigError::SelfPairing(entry.id));
                }

                if sd_by_plus_one.insert(plus_one_channel, entry.id).is_some()
                    || sd_by_hd.contains_key(&plus_one_channel)
                {
                    return Err(ConfigError::ConflictingPairing(plus_one_channel));
                }
            }
        }

        // An HD channel is the end of a chain. A +1 channel may have an HD version, but no +1 of
        // its own.
        for hd_channel in sd_by_hd.keys() {
            let hd_entry = &by_id[hd_channel];
            if hd_entry.hd_channel.is_some() || hd_entry.plus_one_channel.is_some() {
                return Err(ConfigError::ConflictingPairing(*hd_channel));
            }
        }

        for plus_one_channel in sd_by_plus_one.keys() {
            if by_id[plus_one_channel].plus_one_channel.is_some() {
                return Err(ConfigError::ConflictingPairing(*plus_one_channel));
            }
        }

        // BTreeMap iteration order gives us the source list sorted by channel id
        let source_list = by_id
            .values()
            .filter(|entry| entry.visible)
            .map(|entry| entry.name.clone())
            .collect();

        Ok(ChannelDirectory {
            entries: by_id,
            ids_by_name,
            sd_by_hd,
            sd_by_plus_one,
            source_list,
        })
    }

    pub fn get(&self, channel_id: u16) -> Option<&ChannelEntry> {
        self.entries.get(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id_for_name(&self, name: &str) -> Option<u16> {
        self.ids_by_name.get(name).copied()
    }

    pub fn name_for_id(&self, channel_id: u16) -> Option<&str> {
        self.entries.get(&channel_id).map(|entry| entry.name.as_str())
    }

    pub fn hd_channel(&self, channel_id: u16) -> Option<u16> {
        self.entries
            .get(&channel_id)
            .and_then(|entry| entry.hd_channel)
    }

    pub fn plus_one_channel(&self, channel_id: u16) -> Option<u16> {
        self.entries
            .get(&channel_id)
            .and_then(|entry| entry.plus_one_channel)
    }

    /// The channel to tune to when `channel_id` is requested: its HD version if it has one.
    pub fn hd_preferred(&self, channel_id: u16) -> u16 {
        self.hd_channel(channel_id).unwrap_or(channel_id)
    }

    /// Resolve any channel (HD, +1, or HD version of a +1) back to its SD channel.
    pub fn sd_channel(&self, channel_id: u16) -> u16 {
        let mut sd_channel = channel_id;

        if let Some(base) = self.sd_by_hd.get(&sd_channel) {
            sd_channel = *base;
        }

        if let Some(base) = self.sd_by_plus_one.get(&sd_channel) {
            sd_channel = *base;
        }

        sd_channel
    }

    /// The channel which `channel_id` is the HD version of.
    pub fn hd_base(&self, channel_id: u16) -> Option<u16> {
        self.sd_by_hd.get(&channel_id).copied()
    }

    /// Is `channel_id` the HD version of another channel.
    pub fn is_hd_channel(&self, channel_id: u16) -> bool {
        self.sd_by_hd.contains_key(&channel_id)
    }

    /// Is `channel_id` the +1 version of another channel.
    pub fn is_plus_one_channel(&self, channel_id: u16) -> bool {
        self.sd_by_plus_one.contains_key(&channel_id)
    }

    /// Names of all visible channels, ordered by channel id.
    pub fn source_list(&self) -> &[String] {
        &self.source_list
    }

    pub fn automation(&self, channel_id: u16) -> Option<&Automation> {
        self.entries
            .get(&channel_id)
            .and_then(|entry| entry.automation.as_ref())
    }

    pub fn logo_url(&self, channel_id: u16) -> Option<&str> {
        self.entries
            .get(&channel_id)
            .and_then(|entry| entry.logo_url.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.entries.values()
    }
}

// ================================================================================================
// Tests

#[cfg(test)]
pub(crate) mod tests {
    use super::{ChannelDirectory, ChannelEntry};
    use crate::config::ConfigError;

    /// A small directory resembling a real channel line-up.
    pub(crate) fn test_directory() -> ChannelDirectory {
        ChannelDirectory::new(vec![
            ChannelEntry::new(101, "BBC One")
                .with_hd_channel(108)
                .with_logo_url("http://logos.example/bbc_one.png"),
            ChannelEntry::new(108, "BBC One HD").with_visible(false),
            ChannelEntry::new(105, "Channel 4")
                .with_hd_channel(141)
                .with_plus_one_channel(142),
            ChannelEntry::new(141, "Channel 4 HD").with_visible(false),
            ChannelEntry::new(142, "Channel 4 +1").with_hd_channel(143),
            ChannelEntry::new(143, "Channel 4 +1 HD").with_visible(false),
            ChannelEntry::new(159, "Liverpool TV"),
            ChannelEntry::new(400, "Games Console").with_automation("media_player.switcher", "HDMI 2"),
        ])
        .unwrap()
    }

    #[test]
    fn name_and_id_lookup() {
        let directory = test_directory();

        assert_eq!(directory.id_for_name("BBC One"), Some(101));
        assert_eq!(directory.id_for_name("Unknown"), None);
        assert_eq!(directory.name_for_id(159), Some("Liverpool TV"));
        assert_eq!(directory.name_for_id(999), None);
        assert_eq!(directory.len(), 8);
    }

    #[test]
    fn sd_channel_resolution() {
        let directory = test_directory();

        // HD and +1 targets resolve back to their base channel
        for entry in directory.iter() {
            if let Some(hd_channel) = entry.hd_channel {
                if !directory.is_plus_one_channel(entry.id) {
                    assert_eq!(directory.sd_channel(hd_channel), entry.id);
                }
            }
            if let Some(plus_one_channel) = entry.plus_one_channel {
                assert_eq!(directory.sd_channel(plus_one_channel), entry.id);
            }
        }

        // HD version of a +1 channel takes two hops
        assert_eq!(directory.sd_channel(143), 105);

        // Unpaired channels are fixed points
        assert_eq!(directory.sd_channel(159), 159);
        assert_eq!(directory.sd_channel(101), 101);
        assert_eq!(directory.sd_channel(777), 777);
    }

    #[test]
    fn hd_and_plus_one_are_exclusive() {
        let directory = test_directory();

        for id in 1..=999 {
            assert!(!(directory.is_hd_channel(id) && directory.is_plus_one_channel(id)));
        }

        assert!(directory.is_hd_channel(108));
        assert!(directory.is_hd_channel(143));
        assert!(directory.is_plus_one_channel(142));
        assert!(!directory.is_hd_channel(101));
        assert!(!directory.is_plus_one_channel(101));
    }

    #[test]
    fn hd_preferred() {
        let directory = test_directory();

        assert_eq!(directory.hd_preferred(101), 108);
        assert_eq!(directory.hd_preferred(142), 143);
        assert_eq!(directory.hd_preferred(159), 159);

        assert_eq!(directory.hd_base(108), Some(101));
        assert_eq!(directory.hd_base(143), Some(142));
        assert_eq!(directory.hd_base(101), None);
    }

    #[test]
    fn source_list_is_visible_names_ordered_by_id() {
        let directory = test_directory();

        assert_eq!(
            directory.source_list(),
            &["BBC One", "Channel 4", "Channel 4 +1", "Liverpool TV", "Games Console"]
        );
    }

    #[test]
    fn automation_lookup() {
        let directory = test_directory();

        let automation = directory.automation(400).unwrap();
        assert_eq!(automation.target, "media_player.switcher");
        assert_eq!(automation.source, "HDMI 2");
        assert!(directory.automation(101).is_none());
    }

    #[test]
    fn rejects_unknown_pairings() {
        assert_eq!(
            ChannelDirectory::new(vec![ChannelEntry::new(101, "BBC One").with_hd_channel(108)])
                .unwrap_err(),
            ConfigError::UnknownHdChannel {
                channel: 101,
                hd_channel: 108
            }
        );

        assert_eq!(
            ChannelDirectory::new(vec![
                ChannelEntry::new(105, "Channel 4").with_plus_one_channel(142)
            ])
            .unwrap_err(),
            ConfigError::UnknownPlusOneChannel {
                channel: 105,
                plus_one_channel: 142
            }
        );
    }

    #[test]
    fn rejects_inconsistent_pairings() {
        // Same channel used as both an HD and a +1 target
        assert_eq!(
            ChannelDirectory::new(vec![
                ChannelEntry::new(101, "BBC One").with_hd_channel(200),
                ChannelEntry::new(102, "BBC Two").with_plus_one_channel(200),
                ChannelEntry::new(200, "Mystery"),
            ])
            .unwrap_err(),
            ConfigError::ConflictingPairing(200)
        );

        // Two channels claiming the same HD version
        assert_eq!(
            ChannelDirectory::new(vec![
                ChannelEntry::new(101, "BBC One").with_hd_channel(108),
                ChannelEntry::new(102, "BBC Two").with_hd_channel(108),
                ChannelEntry::new(108, "BBC HD"),
            ])
            .unwrap_err(),
            ConfigError::ConflictingPairing(108)
        );

        // An HD channel with a +1 of its own
        assert_eq!(
            ChannelDirectory::new(vec![
                ChannelEntry::new(101, "BBC One").with_hd_channel(108),
                ChannelEntry::new(108, "BBC One HD").with_plus_one_channel(109),
                ChannelEntry::new(109, "BBC One HD +1"),
            ])
            .unwrap_err(),
            ConfigError::ConflictingPairing(108)
        );

        assert_eq!(
            ChannelDirectory::new(vec![ChannelEntry::new(101, "BBC One").with_hd_channel(101)])
                .unwrap_err(),
            ConfigError::SelfPairing(101)
        );
    }

    #[test]
    fn rejects_invalid_ids_and_duplicate_names() {
        assert_eq!(
            ChannelDirectory::new(vec![ChannelEntry::new(1000, "Too High")]).unwrap_err(),
            ConfigError::InvalidChannelId("1000".into())
        );

        assert_eq!(
            ChannelDirectory::new(vec![ChannelEntry::new(0, "Too Low")]).unwrap_err(),
            ConfigError::InvalidChannelId("0".into())
        );

        assert_eq!(
            ChannelDirectory::new(vec![
                ChannelEntry::new(101, "BBC One"),
                ChannelEntry::new(102, "BBC One"),
            ])
            .unwrap_err(),
            ConfigError::DuplicateChannelName("BBC One".into())
        );
    }
}
