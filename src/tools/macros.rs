// Unit tests for the `#[tool]` proc-macro
#[cfg(test)]
mod tests {
	use tokio_test::block_on;
	use serde_json::json;

	use crate::tools::params::ToolParams;
	use crate::tools::traits::Tool;
	use crate::tools::ToolRegistry;
	use crate::parser::ActionArg;

	// crate-local path so the macro expands with `crate` references inside the library tests
	#[crate::tool(
		name = "threat_report",
		description = "Summarise raid danger for a faction",
		params(faction = "Faction name, e.g. 'Pirates'", raiders = "Expected raider count")
	)]
	fn threat_report(faction: String, raiders: Option<u32>) -> String {
		match raiders {
			Some(n) => format!("{} raid with {} raiders", faction, n),
			None => format!("{} raid, size unknown", faction),
		}
	}

	#[crate::tool(description = "Chop trees in a zone", params(zone = "Zone id"))]
	async fn chop_wood(zone: u32) -> Result<String, String> {
		if zone == 0 {
			Err("zone 0 is the home area".to_string())
		} else {
			Ok(format!("chopping in zone {}", zone))
		}
	}

	#[test]
	fn generated_schema_follows_signature() {
		let tool = ThreatReportTool;
		assert_eq!(tool.name(), "threat_report");
		let params = tool.params();
		assert_eq!(params.len(), 2);
		assert_eq!(params[0].name, "faction");
		assert!(params[0].required);
		assert_eq!(params[1].arg_type, "integer");
		assert!(!params[1].required);
	}

	#[test]
	fn string_arguments_are_coerced() {
		let tool = ThreatReportTool;
		let params = ToolParams::new().with("faction", "Pirates").with("raiders", "7");
		let got = block_on(tool.execute(params)).expect("tool run failed");
		assert_eq!(got, json!("Pirates raid with 7 raiders"));

		let got = block_on(tool.execute(ToolParams::new().with("faction", "Tribe"))).unwrap();
		assert_eq!(got, json!("Tribe raid, size unknown"));
	}

	#[test]
	fn positional_call_binds_through_registry() {
		let registry = ToolRegistry::new();
		registry.register_tool(ChopWoodTool);

		let ok = block_on(registry.dispatch(
			&crate::parser::ActionCall::new("chop_wood").with_arg(ActionArg::positional("3")),
		));
		assert_eq!(ok.to_observation(), "chopping in zone 3");

		let err = block_on(registry.dispatch(
			&crate::parser::ActionCall::new("chop_wood").with_arg(ActionArg::positional("0")),
		));
		assert!(err.to_observation().contains("zone 0 is the home area"));
	}
}
