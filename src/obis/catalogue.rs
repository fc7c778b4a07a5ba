use super::ObisCode;

pub const ENERGY_IMPORTED: ObisCode = ObisCode::new(1, 0, 1, 8, 0);
pub const ENERGY_IMPORTED_TARIFF1: ObisCode = ObisCode::new(1, 0, 1, 8, 1);
pub const ENERGY_IMPORTED_TARIFF2: ObisCode = ObisCode::new(1, 0, 1, 8, 2);
pub const ENERGY_EXPORTED: ObisCode = ObisCode::new(1, 0, 2, 8, 0);
pub const ENERGY_EXPORTED_TARIFF1: ObisCode = ObisCode::new(1, 0, 2, 8, 1);
pub const ENERGY_EXPORTED_TARIFF2: ObisCode = ObisCode::new(1, 0, 2, 8, 2);
pub const REACTIVE_ENERGY_IMPORTED: ObisCode = ObisCode::new(1, 0, 3, 8, 0);
pub const REACTIVE_ENERGY_EXPORTED: ObisCode = ObisCode::new(1, 0, 4, 8, 0);
pub const POWER_IMPORTED: ObisCode = ObisCode::new(1, 0, 1, 7, 0);
pub const POWER_EXPORTED: ObisCode = ObisCode::new(1, 0, 2, 7, 0);
pub const REACTIVE_POWER_IMPORTED: ObisCode = ObisCode::new(1, 0, 3, 7, 0);
pub const REACTIVE_POWER_EXPORTED: ObisCode = ObisCode::new(1, 0, 4, 7, 0);
pub const POWER_IMPORTED_L1: ObisCode = ObisCode::new(1, 0, 21, 7, 0);
pub const POWER_EXPORTED_L1: ObisCode = ObisCode::new(1, 0, 22, 7, 0);
pub const POWER_IMPORTED_L2: ObisCode = ObisCode::new(1, 0, 41, 7, 0);
pub const POWER_EXPORTED_L2: ObisCode = ObisCode::new(1, 0, 42, 7, 0);
pub const POWER_IMPORTED_L3: ObisCode = ObisCode::new(1, 0, 61, 7, 0);
pub const POWER_EXPORTED_L3: ObisCode = ObisCode::new(1, 0, 62, 7, 0);
pub const REACTIVE_POWER_IMPORTED_L1: ObisCode = ObisCode::new(1, 0, 23, 7, 0);
pub const REACTIVE_POWER_EXPORTED_L1: ObisCode = ObisCode::new(1, 0, 24, 7, 0);
pub const REACTIVE_POWER_IMPORTED_L2: ObisCode = ObisCode::new(1, 0, 43, 7, 0);
pub const REACTIVE_POWER_EXPORTED_L2: ObisCode = ObisCode::new(1, 0, 44, 7, 0);
pub const REACTIVE_POWER_IMPORTED_L3: ObisCode = ObisCode::new(1, 0, 63, 7, 0);
pub const REACTIVE_POWER_EXPORTED_L3: ObisCode = ObisCode::new(1, 0, 64, 7, 0);
pub const VOLTAGE_L1: ObisCode = ObisCode::new(1, 0, 32, 7, 0);
pub const VOLTAGE_L2: ObisCode = ObisCode::new(1, 0, 52, 7, 0);
pub const VOLTAGE_L3: ObisCode = ObisCode::new(1, 0, 72, 7, 0);
pub const CURRENT_L1: ObisCode = ObisCode::new(1, 0, 31, 7, 0);
pub const CURRENT_L2: ObisCode = ObisCode::new(1, 0, 51, 7, 0);
pub const CURRENT_L3: ObisCode = ObisCode::new(1, 0, 71, 7, 0);
pub const CT_RATIO: ObisCode = ObisCode::new(1, 0, 1, 4, 2);
pub const VT_RATIO: ObisCode = ObisCode::new(1, 0, 1, 4, 3);

/// A code that can be configured by name instead of by its textual form.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownSensor {
    pub name: &'static str,
    pub code: ObisCode,
    pub description: &'static str,
}

const fn sensor(name: &'static str, code: ObisCode, description: &'static str) -> WellKnownSensor {
    WellKnownSensor { name, code, description }
}

pub const WELL_KNOWN_SENSORS: &[WellKnownSensor] = &[
    sensor("energy_imported", ENERGY_IMPORTED, "Active energy + (total)"),
    sensor("energy_imported_tariff1", ENERGY_IMPORTED_TARIFF1, "Active energy + (tariff 1)"),
    sensor("energy_imported_tariff2", ENERGY_IMPORTED_TARIFF2, "Active energy + (tariff 2)"),
    sensor("energy_exported", ENERGY_EXPORTED, "Active energy - (total)"),
    sensor("energy_exported_tariff1", ENERGY_EXPORTED_TARIFF1, "Active energy - (tariff 1)"),
    sensor("energy_exported_tariff2", ENERGY_EXPORTED_TARIFF2, "Active energy - (tariff 2)"),
    sensor("reactive_energy_imported", REACTIVE_ENERGY_IMPORTED, "Reactive energy + (total)"),
    sensor("reactive_energy_exported", REACTIVE_ENERGY_EXPORTED, "Reactive energy - (total)"),
    sensor("power_imported", POWER_IMPORTED, "Active power + (total)"),
    sensor("power_exported", POWER_EXPORTED, "Active power - (total)"),
    sensor("reactive_power_imported", REACTIVE_POWER_IMPORTED, "Reactive power + (total)"),
    sensor("reactive_power_exported", REACTIVE_POWER_EXPORTED, "Reactive power - (total)"),
    sensor("power_imported_l1", POWER_IMPORTED_L1, "Active power + (L1)"),
    sensor("power_exported_l1", POWER_EXPORTED_L1, "Active power - (L1)"),
    sensor("power_imported_l2", POWER_IMPORTED_L2, "Active power + (L2)"),
    sensor("power_exported_l2", POWER_EXPORTED_L2, "Active power - (L2)"),
    sensor("power_imported_l3", POWER_IMPORTED_L3, "Active power + (L3)"),
    sensor("power_exported_l3", POWER_EXPORTED_L3, "Active power - (L3)"),
    sensor("reactive_power_imported_l1", REACTIVE_POWER_IMPORTED_L1, "Reactive power + (L1)"),
    sensor("reactive_power_exported_l1", REACTIVE_POWER_EXPORTED_L1, "Reactive power - (L1)"),
    sensor("reactive_power_imported_l2", REACTIVE_POWER_IMPORTED_L2, "Reactive power + (L2)"),
    sensor("reactive_power_exported_l2", REACTIVE_POWER_EXPORTED_L2, "Reactive power - (L2)"),
    sensor("reactive_power_imported_l3", REACTIVE_POWER_IMPORTED_L3, "Reactive power + (L3)"),
    sensor("reactive_power_exported_l3", REACTIVE_POWER_EXPORTED_L3, "Reactive power - (L3)"),
    sensor("voltage_l1", VOLTAGE_L1, "Voltage (L1)"),
    sensor("voltage_l2", VOLTAGE_L2, "Voltage (L2)"),
    sensor("voltage_l3", VOLTAGE_L3, "Voltage (L3)"),
    sensor("current_l1", CURRENT_L1, "Current (L1)"),
    sensor("current_l2", CURRENT_L2, "Current (L2)"),
    sensor("current_l3", CURRENT_L3, "Current (L3)"),
    sensor("ct_ratio", CT_RATIO, "Current transformer ratio"),
    sensor("vt_ratio", VT_RATIO, "Voltage transformer ratio"),
];

pub fn get_well_known_sensor(name: &str) -> Option<&'static WellKnownSensor> {
    WELL_KNOWN_SENSORS.iter().find(|sensor| sensor.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_get_well_known_sensor() {
        assert_eq!(get_well_known_sensor("energy_imported").map(|s| s.code), Some(ENERGY_IMPORTED));
        assert_eq!(get_well_known_sensor("current_l2").map(|s| s.code), Some(CURRENT_L2));
        assert!(get_well_known_sensor("nonexistent").is_none());
    }

    #[test]
    fn test_catalogue_has_unique_names_and_codes() {
        let names: HashSet<_> = WELL_KNOWN_SENSORS.iter().map(|s| s.name).collect();
        let codes: HashSet<_> = WELL_KNOWN_SENSORS.iter().map(|s| s.code).collect();
        assert_eq!(names.len(), WELL_KNOWN_SENSORS.len());
        assert_eq!(codes.len(), WELL_KNOWN_SENSORS.len());
    }
}
