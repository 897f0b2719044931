//! Built-in managed-entity definitions.
//!
//! Subset of ITU-T G.988 covering the classes the codec builds against and
//! the classes commonly seen in OLT/ONU captures. Attribute indices, widths
//! and alarm numbers follow the recommendation.

use super::{AttributeDef, AttributeKind, MeDefinition};

const fn attr(name: &'static str, index: u16, kind: AttributeKind, size: usize) -> AttributeDef {
    AttributeDef {
        name,
        index,
        kind,
        size,
    }
}

use AttributeKind::{BitField, Integer, Octets, String as Text};

const ONU_DATA_ATTRS: &[AttributeDef] = &[attr("MibDataSync", 1, Integer, 1)];

const ONU_G_ATTRS: &[AttributeDef] = &[
    attr("VendorId", 1, Text, 4),
    attr("Version", 2, Text, 14),
    attr("SerialNumber", 3, Octets, 8),
    attr("TrafficManagementOption", 4, Integer, 1),
    attr("Deprecated", 5, Integer, 1),
    attr("BatteryBackup", 6, Integer, 1),
    attr("AdministrativeState", 7, Integer, 1),
    attr("OperationalState", 8, Integer, 1),
    attr("OnuSurvivalTime", 9, Integer, 1),
    attr("LogicalOnuId", 10, Text, 24),
    attr("LogicalPassword", 11, Text, 12),
    attr("CredentialsStatus", 12, Integer, 1),
    attr("ExtendedTcLayerOptions", 13, BitField, 2),
];

const ONU_G_ALARMS: &[(u8, &str)] = &[
    (0, "Equipment alarm"),
    (1, "Powering alarm"),
    (2, "Battery missing"),
    (3, "Battery failure"),
    (4, "Battery low"),
    (5, "Physical intrusion"),
    (6, "Onu self-test failure"),
    (7, "Dying gasp"),
    (8, "Temperature yellow"),
    (9, "Temperature red"),
    (10, "Voltage yellow"),
    (11, "Voltage red"),
    (12, "Onu manual power off"),
    (13, "Inv image"),
    (14, "PSE overload yellow"),
    (15, "PSE overload red"),
];

const ONU2_G_ATTRS: &[AttributeDef] = &[
    attr("EquipmentId", 1, Text, 20),
    attr("OmccVersion", 2, Integer, 1),
    attr("VendorProductCode", 3, Integer, 2),
    attr("SecurityCapability", 4, Integer, 1),
    attr("SecurityMode", 5, Integer, 1),
    attr("TotalPriorityQueueNumber", 6, Integer, 2),
    attr("TotalTrafficSchedulerNumber", 7, Integer, 1),
    attr("Deprecated", 8, Integer, 4),
    attr("TotalGemPortIdNumber", 9, Integer, 2),
    attr("Sysuptime", 10, Integer, 4),
    attr("ConnectivityCapability", 11, BitField, 2),
    attr("CurrentConnectivityMode", 12, Integer, 1),
    attr("QosConfigurationFlexibility", 13, BitField, 2),
    attr("PriorityQueueScaleFactor", 14, Integer, 2),
];

const T_CONT_ATTRS: &[AttributeDef] = &[
    attr("AllocId", 1, Integer, 2),
    attr("Deprecated", 2, Integer, 1),
    attr("Policy", 3, Integer, 1),
];

const ANI_G_ATTRS: &[AttributeDef] = &[
    attr("SrIndication", 1, Integer, 1),
    attr("TotalTcontNumber", 2, Integer, 2),
    attr("GemBlockLength", 3, Integer, 2),
    attr("PiggybackDbaReporting", 4, Integer, 1),
    attr("Deprecated", 5, Integer, 1),
    attr("SignalFailThreshold", 6, Integer, 1),
    attr("SignalDegradeThreshold", 7, Integer, 1),
    attr("Arc", 8, Integer, 1),
    attr("ArcInterval", 9, Integer, 1),
    attr("OpticalSignalLevel", 10, Integer, 2),
    attr("LowerOpticalThreshold", 11, Integer, 1),
    attr("UpperOpticalThreshold", 12, Integer, 1),
    attr("OnuResponseTime", 13, Integer, 2),
    attr("TransmitOpticalLevel", 14, Integer, 2),
    attr("LowerTransmitPowerThreshold", 15, Integer, 1),
    attr("UpperTransmitPowerThreshold", 16, Integer, 1),
];

const ANI_G_ALARMS: &[(u8, &str)] = &[
    (0, "Low received optical power"),
    (1, "High received optical power"),
    (2, "Signal fail"),
    (3, "Signal degrade"),
    (4, "Low transmit optical power"),
    (5, "High transmit optical power"),
    (6, "Laser bias current"),
];

const GEM_PORT_NETWORK_CTP_ATTRS: &[AttributeDef] = &[
    attr("PortId", 1, Integer, 2),
    attr("TContPointer", 2, Integer, 2),
    attr("Direction", 3, Integer, 1),
    attr("TrafficManagementPointerForUpstream", 4, Integer, 2),
    attr("TrafficDescriptorProfilePointerForUpstream", 5, Integer, 2),
    attr("UniCounter", 6, Integer, 1),
    attr("PriorityQueuePointerForDownStream", 7, Integer, 2),
    attr("EncryptionState", 8, Integer, 1),
    attr("TrafficDescriptorProfilePointerForDownstream", 9, Integer, 2),
    attr("EncryptionKeyRing", 10, Integer, 1),
];

const GEM_PORT_NETWORK_CTP_ALARMS: &[(u8, &str)] = &[(5, "End-to-end loss of continuity")];

const GAL_ETHERNET_PROFILE_ATTRS: &[AttributeDef] =
    &[attr("MaximumGemPayloadSize", 1, Integer, 2)];

pub(super) const BASELINE_CLASSES: &[MeDefinition] = &[
    MeDefinition {
        class_id: 2,
        name: "ONU Data",
        attributes: ONU_DATA_ATTRS,
        alarms: &[],
    },
    MeDefinition {
        class_id: 256,
        name: "ONU-G",
        attributes: ONU_G_ATTRS,
        alarms: ONU_G_ALARMS,
    },
    MeDefinition {
        class_id: 257,
        name: "ONU2-G",
        attributes: ONU2_G_ATTRS,
        alarms: &[],
    },
    MeDefinition {
        class_id: 262,
        name: "T-CONT",
        attributes: T_CONT_ATTRS,
        alarms: &[],
    },
    MeDefinition {
        class_id: 263,
        name: "ANI-G",
        attributes: ANI_G_ATTRS,
        alarms: ANI_G_ALARMS,
    },
    MeDefinition {
        class_id: 268,
        name: "GEM Port Network CTP",
        attributes: GEM_PORT_NETWORK_CTP_ATTRS,
        alarms: GEM_PORT_NETWORK_CTP_ALARMS,
    },
    MeDefinition {
        class_id: 272,
        name: "GAL Ethernet Profile",
        attributes: GAL_ETHERNET_PROFILE_ATTRS,
        alarms: &[],
    },
];
