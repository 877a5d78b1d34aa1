#[cfg(test)]
mod tests {
    use api_contract::{
        check, check_eq, contract_test, Error, HarnessConfiguration, HarnessMode, Scenario,
        StepStatus,
    };

    fn configure_playback(config: &mut HarnessConfiguration) {
        config.set_mode(HarnessMode::Playback);
        config.set_playback_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/playback_data"));
    }

    #[contract_test("single_user", configure_playback)]
    fn body_runs_inside_a_scenario(scenario: &Scenario) -> Result<(), Error> {
        check_eq!(scenario.name(), "single_user");
        check_eq!(scenario.mode(), HarnessMode::Playback);

        let body = scenario.step("Fetch user 2", || {
            let request = scenario.spec().get("/users/2").build()?;
            let response = scenario.send(request)?;
            scenario.expect(
                &response,
                &scenario.response_spec().with_schema("GetUserSchema"),
            )
        })?;

        check_eq!(body["data"]["first_name"], "Janet");
        Ok(())
    }

    #[contract_test("single_user", configure_playback)]
    fn failed_steps_are_recorded_even_when_handled(scenario: &Scenario) -> Result<(), Error> {
        let outcome = scenario.step("Fetch user 2", || {
            scenario.step("Send", || {
                let request = scenario.spec().get("/users/2").build()?;
                scenario.send(request)
            })?;
            scenario.step("Expect a server error", || -> Result<(), Error> {
                Err(Error::UnexpectedStatusCode {
                    expected: 500,
                    actual: 200,
                })
            })
        });
        check!(outcome.is_err());

        let report = scenario.report();
        let names: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
        check_eq!(names, vec!["Send", "Expect a server error", "Fetch user 2"]);
        check_eq!(report.steps[1].status, StepStatus::Failed);
        check_eq!(report.steps[1].parent.as_deref(), Some("Fetch user 2"));
        check_eq!(report.steps[2].status, StepStatus::Failed);
        check_eq!(report.steps[2].exchanges.len(), 1);
        check!(!report.passed());
        Ok(())
    }
}
