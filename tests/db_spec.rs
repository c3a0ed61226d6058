use chrono::NaiveDate;
use presentation_scheduler::db::{Database, DbError};
use presentation_scheduler::engine::{Schedule, ScheduleError};
use presentation_scheduler::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_project(db: &Database, name: &str) -> Project {
    db.create_project(CreateProjectInput {
        name: name.to_string(),
        description: None,
        attachment: None,
    })
    .expect("Failed to create project")
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
}

fn small_config(total: u32) -> ScheduleConfig {
    ScheduleConfig {
        presentations_before_break: total,
        presentations_after_break: 0,
        total_presentation_count: total,
        ..ScheduleConfig::default()
    }
}

/// A complete save payload drawing on every project in the database.
fn save_input(db: &Database, total: u32) -> SaveScheduleInput {
    let candidates = db
        .get_candidates(&CandidateRequest {
            desired_count: total,
            selected_ids: vec![],
        })
        .expect("Failed to fetch candidates");
    Schedule::prepare(small_config(total), candidates, day())
        .expect("Failed to prepare")
        .to_save_input(None)
        .expect("Schedule incomplete")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "projects" {
        describe "create_project" {
            it "creates a project with required fields" {
                let project = create_test_project(&db, "Clean Water Initiative");

                assert_eq!(project.name, "Clean Water Initiative");
                assert!(project.description.is_none());
                assert!(project.attachment.is_none());
            }

            it "stores the attachment" {
                let project = db.create_project(CreateProjectInput {
                    name: "School Meals".to_string(),
                    description: Some("Daily lunches".to_string()),
                    attachment: Some(FileRef {
                        name: "proposal.pdf".to_string(),
                        url: "/files/proposal.pdf".to_string(),
                    }),
                }).expect("Failed to create project");

                let found = db.get_project(project.id).expect("Query failed").unwrap();
                assert_eq!(found.description, Some("Daily lunches".to_string()));
                assert_eq!(found.attachment.unwrap().name, "proposal.pdf");
            }
        }

        describe "get_project" {
            it "returns None for non-existent project" {
                let result = db.get_project(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }
        }

        describe "get_all_projects" {
            it "returns all projects ordered by name" {
                create_test_project(&db, "Zebra Conservation");
                create_test_project(&db, "Alpha Literacy");

                let projects = db.get_all_projects().expect("Query failed");
                assert_eq!(projects.len(), 2);
                assert_eq!(projects[0].name, "Alpha Literacy");
                assert_eq!(projects[1].name, "Zebra Conservation");
            }
        }

        describe "update_project" {
            it "updates only provided fields" {
                let project = create_test_project(&db, "Original");

                let updated = db.update_project(project.id, UpdateProjectInput {
                    description: Some("Now described".to_string()),
                    ..Default::default()
                }).expect("Update failed").unwrap();

                assert_eq!(updated.name, "Original");
                assert_eq!(updated.description, Some("Now described".to_string()));
            }

            it "returns None for non-existent project" {
                let result = db.update_project(Uuid::new_v4(), UpdateProjectInput::default())
                    .expect("Update failed");
                assert!(result.is_none());
            }
        }

        describe "delete_project" {
            it "deletes an unscheduled project" {
                let project = create_test_project(&db, "Short Lived");
                assert!(db.delete_project(project.id).expect("Delete failed"));
                assert!(db.get_project(project.id).expect("Query failed").is_none());
            }

            it "refuses to delete a scheduled project" {
                let project = create_test_project(&db, "Booked");
                db.create_schedule(save_input(&db, 1)).expect("Failed to save");

                let err = db.delete_project(project.id).unwrap_err();
                assert_eq!(err.downcast_ref::<DbError>(), Some(&DbError::ProjectInUse(project.id)));
            }
        }
    }

    describe "candidates" {
        it "puts selected projects first and fills up to the desired count" {
            let a = create_test_project(&db, "A");
            let b = create_test_project(&db, "B");
            let c = create_test_project(&db, "C");
            create_test_project(&db, "D");

            let candidates = db.get_candidates(&CandidateRequest {
                desired_count: 3,
                selected_ids: vec![c.id, Uuid::new_v4()],
            }).expect("Query failed");

            let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![c.id, a.id, b.id]);
            assert!(candidates.iter().all(|c| !c.is_claimed()));
        }

        it "returns every selected project even beyond the desired count" {
            let a = create_test_project(&db, "A");
            let b = create_test_project(&db, "B");

            let candidates = db.get_candidates(&CandidateRequest {
                desired_count: 1,
                selected_ids: vec![b.id, a.id],
            }).expect("Query failed");

            assert_eq!(candidates.len(), 2);
            assert_eq!(candidates[0].id, b.id);
        }
    }

    describe "schedules" {
        describe "create_schedule" {
            it "persists configuration and items" {
                create_test_project(&db, "One");
                create_test_project(&db, "Two");
                let input = save_input(&db, 2);

                let record = db.create_schedule(input.clone()).expect("Failed to save");

                assert_eq!(instant_to_date(record.date), day());
                assert_eq!(record.config, input.config);
                assert_eq!(record.schedule_items, input.schedule_items);

                let loaded = db.get_schedule(record.id).expect("Query failed").unwrap();
                assert_eq!(loaded.schedule_items, input.schedule_items);
                assert_eq!(loaded.config.lunch, input.config.lunch);
            }

            it "rejects incomplete schedules" {
                create_test_project(&db, "One");
                let mut input = save_input(&db, 1);
                input.schedule_items[0] = ScheduleItem::unassigned(input.schedule_items[0].slot);

                let err = db.create_schedule(input).unwrap_err();
                assert_eq!(
                    err.downcast_ref::<ScheduleError>(),
                    Some(&ScheduleError::IncompleteSchedule { unassigned: 1 })
                );
                assert!(db.list_schedules().expect("Query failed").is_empty());
            }

            it "rejects slots the configuration does not produce" {
                create_test_project(&db, "One");
                create_test_project(&db, "Two");
                let mut input = save_input(&db, 2);
                let slot = &mut input.schedule_items[1].slot;
                slot.presentation_end = slot.presentation_end + 30;

                let err = db.create_schedule(input).unwrap_err();
                assert_eq!(
                    err.downcast_ref::<ScheduleError>(),
                    Some(&ScheduleError::UnknownSlot(1))
                );
                assert!(db.list_schedules().expect("Query failed").is_empty());
            }

            it "rejects unknown projects" {
                create_test_project(&db, "One");
                let mut input = save_input(&db, 1);
                let stranger = Uuid::new_v4();
                input.schedule_items[0].project_id = Some(stranger);

                let err = db.create_schedule(input).unwrap_err();
                assert_eq!(err.downcast_ref::<DbError>(), Some(&DbError::UnknownProject(stranger)));
            }
        }

        describe "update_schedule" {
            it "replaces configuration and items" {
                create_test_project(&db, "One");
                create_test_project(&db, "Two");
                create_test_project(&db, "Three");
                let record = db.create_schedule(save_input(&db, 3)).expect("Failed to save");

                let kept: Vec<ScheduleItem> = record.schedule_items[..2].to_vec();
                let input = SaveScheduleInput {
                    schedule_id: Some(record.id),
                    date: record.date,
                    config: small_config(2),
                    schedule_items: kept.clone(),
                };

                let updated = db.update_schedule(record.id, input).expect("Update failed").unwrap();
                assert_eq!(updated.schedule_items, kept);
                assert_eq!(updated.config.total_presentation_count, 2);
                assert_eq!(updated.created_at, record.created_at);
            }

            it "returns None for non-existent schedule" {
                create_test_project(&db, "One");
                let result = db.update_schedule(Uuid::new_v4(), save_input(&db, 1))
                    .expect("Update failed");
                assert!(result.is_none());
            }
        }

        describe "list_schedules" {
            it "summarises schedules newest date first" {
                create_test_project(&db, "One");
                let first = db.create_schedule(save_input(&db, 1)).expect("Failed to save");
                let mut later = save_input(&db, 1);
                later.date = date_to_instant(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
                let second = db.create_schedule(later).expect("Failed to save");

                let summaries = db.list_schedules().expect("Query failed");
                assert_eq!(summaries.len(), 2);
                assert_eq!(summaries[0].id, second.id);
                assert_eq!(summaries[1].id, first.id);
                assert_eq!(summaries[0].item_count, 1);
            }
        }

        describe "delete_schedule" {
            it "removes the schedule and frees its projects" {
                let project = create_test_project(&db, "One");
                let record = db.create_schedule(save_input(&db, 1)).expect("Failed to save");

                assert!(db.delete_schedule(record.id).expect("Delete failed"));
                assert!(db.get_schedule(record.id).expect("Query failed").is_none());
                assert!(db.delete_project(project.id).expect("Delete failed"));
            }
        }
    }
}
