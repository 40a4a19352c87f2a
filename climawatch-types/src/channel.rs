//! Channel - static description of one sensor stream.

use alloc::string::String;

/// Static configuration for a sensor channel.
///
/// A channel is created once at startup and never mutated. It ties a broker
/// topic (e.g. `clima/temperatura`) to a short identifier used for snapshot
/// keys, and carries the presentation metadata a dashboard needs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Channel {
    /// Short identifier, unique across the registry (e.g. "temp").
    #[cfg_attr(feature = "minicbor", n(0))]
    pub id: String,

    /// Human-readable name used in logs and notifications.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub label: String,

    /// Unit suffix for display (e.g. "°C", "hPa").
    #[cfg_attr(feature = "minicbor", n(2))]
    pub unit: String,

    /// Broker topic the channel's readings are published on.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub topic: String,

    /// Lower bound of the display axis.
    #[cfg_attr(feature = "minicbor", n(4))]
    pub display_min: f64,

    /// Upper bound of the display axis.
    #[cfg_attr(feature = "minicbor", n(5))]
    pub display_max: f64,
}

impl Channel {
    /// Create a builder for a channel with the given id and topic.
    pub fn builder(id: impl Into<String>, topic: impl Into<String>) -> ChannelBuilder {
        ChannelBuilder::new(id, topic)
    }

    /// Format a value with this channel's unit, e.g. `"21.5 °C"`.
    pub fn format_value(&self, value: f64) -> String {
        if self.unit.is_empty() {
            alloc::format!("{}", value)
        } else {
            alloc::format!("{} {}", value, self.unit)
        }
    }
}

/// Builder for [`Channel`].
#[derive(Debug)]
pub struct ChannelBuilder {
    id: String,
    topic: String,
    label: Option<String>,
    unit: String,
    display_min: f64,
    display_max: f64,
}

impl ChannelBuilder {
    /// Create a new builder.
    pub fn new(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            label: None,
            unit: String::new(),
            display_min: 0.0,
            display_max: 100.0,
        }
    }

    /// Set the display label. Defaults to the id.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the unit suffix.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the display axis bounds.
    pub fn display(mut self, min: f64, max: f64) -> Self {
        self.display_min = min;
        self.display_max = max;
        self
    }

    /// Build the channel.
    pub fn build(self) -> Channel {
        Channel {
            label: self.label.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            unit: self.unit,
            topic: self.topic,
            display_min: self.display_min,
            display_max: self.display_max,
        }
    }
}
